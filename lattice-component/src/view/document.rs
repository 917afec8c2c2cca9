//! Mount points.
//!
//! A [`Document`] is the set of concrete places a rendered view can be
//! attached, addressed by selector. A [`Range`] is a rendered view that can
//! be attached to one of them.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{ComponentError, Result};

use super::node::{Hook, View};

/// Named mount points.
#[derive(Clone, Default)]
pub struct Document {
    mount_points: Arc<RwLock<IndexMap<String, MountPoint>>>,
}

impl Document {
    /// Create a document with no mount points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document with the given mount points.
    pub fn with_mount_points<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let document = Self::new();
        for selector in selectors {
            document.add_mount_point(selector);
        }
        document
    }

    /// Add a mount point, returning the existing one if the selector is taken.
    pub fn add_mount_point(&self, selector: impl Into<String>) -> MountPoint {
        let selector = selector.into();
        self.mount_points
            .write()
            .entry(selector.clone())
            .or_insert_with(|| MountPoint::new(selector))
            .clone()
    }

    /// Resolve a selector.
    pub fn mount_point(&self, selector: &str) -> Option<MountPoint> {
        self.mount_points.read().get(selector).cloned()
    }

    /// Remove a mount point, detaching whatever it holds.
    pub fn remove_mount_point(&self, selector: &str) -> bool {
        let removed = self.mount_points.write().shift_remove(selector);
        match removed {
            Some(mount) => {
                for view in mount.views() {
                    view.set_mount(None);
                }
                mount.views.lock().clear();
                true
            }
            None => false,
        }
    }

    /// Selectors in insertion order.
    pub fn selectors(&self) -> Vec<String> {
        self.mount_points.read().keys().cloned().collect()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.mount_points.read().values()).finish()
    }
}

/// A concrete place views are attached to.
#[derive(Clone)]
pub struct MountPoint {
    selector: Arc<str>,
    views: Arc<Mutex<Vec<View>>>,
}

impl MountPoint {
    fn new(selector: String) -> Self {
        Self {
            selector: selector.into(),
            views: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The selector this mount point answers to.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Attached views, in attachment order.
    pub fn views(&self) -> Vec<View> {
        self.views.lock().clone()
    }

    /// Check if `view` is attached here.
    pub fn contains(&self, view: &View) -> bool {
        self.views.lock().iter().any(|attached| attached == view)
    }

    fn push(&self, view: &View) {
        self.views.lock().push(view.clone());
    }

    pub(crate) fn remove(&self, view: &View) -> bool {
        let mut views = self.views.lock();
        let before = views.len();
        views.retain(|attached| attached != view);
        views.len() != before
    }

    fn same(&self, other: &MountPoint) -> bool {
        Arc::ptr_eq(&self.views, &other.views)
    }
}

impl fmt::Debug for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountPoint")
            .field("selector", &self.selector)
            .field("views", &self.views.lock().len())
            .finish()
    }
}

/// A rendered view that can be attached to a mount point.
#[derive(Clone)]
pub struct Range {
    view: View,
    detached: Arc<AtomicBool>,
}

impl Range {
    pub(crate) fn new(view: View) -> Self {
        Self {
            view,
            detached: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The rendered view.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Attach to `mount`, moving the range if it is attached elsewhere.
    ///
    /// Attaching a range that was detached earlier materializes its view
    /// again.
    pub fn attach(&self, mount: &MountPoint) -> Result<()> {
        if self.view.is_destroyed() {
            return Err(ComponentError::precondition(format!(
                "cannot attach destroyed view {:?}",
                self.view.name()
            )));
        }

        if let Some(current) = self.view.mount() {
            if current.same(mount) {
                return Ok(());
            }
            current.remove(&self.view);
        }

        mount.push(&self.view);
        self.view.set_mount(Some(mount.clone()));
        debug!(view = self.view.id().raw(), mount = mount.selector(), "attached range");

        if self.detached.swap(false, Ordering::SeqCst) {
            self.view.fire(Hook::Materialized);
        }
        Ok(())
    }

    /// Detach from the current mount point. Returns `false` if not attached.
    pub fn detach(&self) -> bool {
        match self.view.set_mount(None) {
            Some(mount) => {
                mount.remove(&self.view);
                self.detached.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Check if the range is attached.
    pub fn is_attached(&self) -> bool {
        self.view.mount().is_some()
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Range")
            .field("view", &self.view)
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Content;

    fn view() -> View {
        View::new("v", |_, _| Ok(Content::Empty))
    }

    #[test]
    fn mount_points_resolve_by_selector() {
        let document = Document::with_mount_points(["body", "#app"]);
        assert!(document.mount_point("#app").is_some());
        assert!(document.mount_point("#missing").is_none());
        assert_eq!(document.selectors(), vec!["body", "#app"]);
    }

    #[test]
    fn attach_moves_between_mount_points() {
        let document = Document::with_mount_points(["a", "b"]);
        let (a, b) = (document.mount_point("a").unwrap(), document.mount_point("b").unwrap());
        let range = Range::new(view());

        range.attach(&a).unwrap();
        assert!(a.contains(range.view()));

        range.attach(&b).unwrap();
        assert!(!a.contains(range.view()));
        assert!(b.contains(range.view()));
    }

    #[test]
    fn reattach_after_detach_rematerializes() {
        let document = Document::with_mount_points(["body"]);
        let body = document.mount_point("body").unwrap();
        let range = Range::new(view());

        range.attach(&body).unwrap();
        assert_eq!(range.view().materializations(), 0);

        assert!(range.detach());
        assert!(!range.detach());
        range.attach(&body).unwrap();
        assert_eq!(range.view().materializations(), 1);
    }

    #[test]
    fn removing_a_mount_point_detaches_views() {
        let document = Document::with_mount_points(["body"]);
        let range = Range::new(view());
        range.attach(&document.mount_point("body").unwrap()).unwrap();

        assert!(document.remove_mount_point("body"));
        assert!(!range.is_attached());
    }
}
