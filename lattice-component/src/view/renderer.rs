//! Reference Renderer
//!
//! Turns views into rendered nodes and keeps them current.
//!
//! # How Rendering Works
//!
//! 1. `render` links the view under its parent and fires `Created`.
//!
//! 2. A data scope gets a data computation first. It stores the scope's
//!    value in the scope's data variable, which is what descendants read.
//!
//! 3. The render computation runs the view's render function with a
//!    [`Tracker`] for itself, then materializes the returned [`Content`]:
//!    text becomes nodes, views, templates, components and inclusions
//!    become child views, each rendered recursively.
//!
//! 4. After the first successful pass the view is marked rendered and fires
//!    `Materialized` then `Rendered`.
//!
//! 5. When something the render pass read changes, the computation is
//!    queued on the [`Runtime`]. On the next flush the old children are
//!    destroyed, the pass runs again and `Rendered` fires again.
//!
//! # Failure
//!
//! An error from a render function aborts that pass. During the initial
//! render it is returned to whoever called `render`; during a reactive
//! re-render it is logged and recorded on the view. Siblings are untouched
//! either way.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{ComponentError, Result};
use crate::reactive::{Computation, Runtime, Tracker};

use super::content::{Content, Inclusion};
use super::document::{Document, MountPoint, Range};
use super::node::{Child, Hook, RenderFn, RenderedNode, View};

/// Renders views against a runtime and a document.
#[derive(Clone)]
pub struct Renderer {
    inner: Arc<RendererInner>,
}

struct RendererInner {
    runtime: Runtime,
    document: Document,
    config: Config,
}

impl Renderer {
    /// Create a renderer with the default configuration.
    pub fn new(runtime: Runtime, document: Document) -> Self {
        Self::build(runtime, document, Config::default())
    }

    /// Create a renderer, and its runtime, from a configuration.
    pub fn from_config(config: Config, document: Document) -> Self {
        let runtime = Runtime::with_max_passes(config.max_flush_passes);
        Self::build(runtime, document, config)
    }

    fn build(runtime: Runtime, document: Document, config: Config) -> Self {
        Self {
            inner: Arc::new(RendererInner {
                runtime,
                document,
                config,
            }),
        }
    }

    /// The runtime render passes are scheduled on.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// The document views are mounted into.
    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// Renderer configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Re-run every invalidated render pass.
    pub fn flush(&self) -> usize {
        self.inner.runtime.flush()
    }

    /// Resolve a mount point, falling back to the configured default.
    pub fn mount_point(&self, selector: Option<&str>) -> Result<MountPoint> {
        let selector = selector.unwrap_or(&self.inner.config.default_mount);
        self.inner
            .document
            .mount_point(selector)
            .ok_or_else(|| ComponentError::MissingMountPoint {
                selector: selector.to_string(),
            })
    }

    /// Render `view` and attach it to a mount point.
    pub fn mount(&self, view: &View, selector: Option<&str>) -> Result<Range> {
        let mount = self.mount_point(selector)?;
        let range = self.render(view, None)?;
        range.attach(&mount)?;
        Ok(range)
    }

    /// Render `view`, optionally as a child of `parent`.
    pub fn render(&self, view: &View, parent: Option<&View>) -> Result<Range> {
        if view.is_destroyed() {
            return Err(ComponentError::precondition(format!(
                "cannot render destroyed view {:?}",
                view.name()
            )));
        }
        if view.is_created() {
            return Err(ComponentError::precondition(format!(
                "view {:?} is already rendered",
                view.name()
            )));
        }

        if let Some(parent) = parent {
            view.set_parent(parent);
        }
        view.mark_created();
        debug!(view = view.id().raw(), name = view.name(), "view created");
        view.fire(Hook::Created);

        let data_error = Arc::new(Mutex::new(None));

        if let (Some(data), Some(var)) = (view.data_source(), view.data_var().cloned()) {
            let weak_view = view.downgrade();
            let failure = data_error.clone();
            let computation = Computation::new_lazy(&self.inner.runtime, move |tracker| {
                match data(tracker) {
                    Ok(value) => {
                        *failure.lock() = None;
                        var.set(value);
                    }
                    Err(err) => {
                        if let Some(view) = weak_view.upgrade() {
                            warn!(view = view.id().raw(), error = %err, "data scope failed");
                            view.record_error(Some(err.clone()));
                        }
                        *failure.lock() = Some(err);
                        var.set(None);
                    }
                }
            });
            view.add_computation(computation.clone());
            computation.execute();
        }

        let weak_renderer = Arc::downgrade(&self.inner);
        let weak_view = view.downgrade();
        let computation = Computation::new_lazy(&self.inner.runtime, move |tracker| {
            let (Some(renderer), Some(view)) = (upgrade(&weak_renderer), weak_view.upgrade())
            else {
                return;
            };
            if view.is_destroyed() {
                return;
            }

            let rerun = tracker.computation().map_or(false, |c| c.run_count() > 0);
            match renderer.render_pass(&view, tracker) {
                Ok(()) => {
                    let failure = data_error.lock().clone();
                    let failed = failure.is_some();
                    view.record_error(failure);
                    if failed {
                        return;
                    }
                    if view.is_rendered() {
                        view.fire(Hook::Rendered);
                    } else if rerun {
                        view.mark_rendered();
                        view.fire(Hook::Materialized);
                        view.fire(Hook::Rendered);
                    }
                }
                Err(err) => {
                    if rerun {
                        error!(view = view.id().raw(), name = view.name(), error = %err, "re-render failed");
                    }
                    view.record_error(Some(err));
                }
            }
        });
        view.add_computation(computation.clone());
        computation.execute();

        if let Some(err) = view.last_error() {
            return Err(err);
        }

        view.mark_rendered();
        view.fire(Hook::Materialized);
        view.fire(Hook::Rendered);
        Ok(Range::new(view.clone()))
    }

    /// Tear down `view` and everything below it.
    ///
    /// Children go first, then the view's computations stop, `Destroyed`
    /// fires and the view leaves its mount point. A second call is a no-op.
    pub fn destroy_view(view: &View) {
        if !view.mark_destroyed() {
            return;
        }
        view.stop_computations();
        for child in view.take_children() {
            dispose(child);
        }
        view.fire(Hook::Destroyed);
        if let Some(mount) = view.set_mount(None) {
            mount.remove(view);
        }
        debug!(view = view.id().raw(), name = view.name(), "view destroyed");
    }

    fn render_pass(&self, view: &View, tracker: &Tracker) -> Result<()> {
        for child in view.take_children() {
            dispose(child);
        }

        let Some(render) = view.render_fn() else {
            view.replace_rendered(Vec::new(), Vec::new());
            return Ok(());
        };

        let mut nodes = Vec::new();
        let mut children = Vec::new();
        let outcome = render(view, tracker)
            .and_then(|content| self.materialize(view, content, &mut nodes, &mut children));

        // partial output is kept so failed children are still torn down later
        view.replace_rendered(nodes, children);
        outcome
    }

    fn materialize(
        &self,
        parent: &View,
        content: Content,
        nodes: &mut Vec<RenderedNode>,
        children: &mut Vec<Child>,
    ) -> Result<()> {
        match content {
            Content::Empty => Ok(()),
            Content::Text(text) => {
                nodes.push(RenderedNode::Text(text));
                Ok(())
            }
            Content::View(view) => self.render_child(parent, Child::view(view), nodes, children),
            Content::Template(template) => self.render_child(
                parent,
                Child::view(View::for_template(&template)),
                nodes,
                children,
            ),
            Content::Component(component) => {
                let view = match component.view() {
                    Some(view) => view,
                    None => component.create_view()?,
                };
                self.render_child(parent, Child::owned(view, component), nodes, children)
            }
            Content::Inclusion(inclusion) => self.render_child(
                parent,
                Child::view(inclusion_view(inclusion)),
                nodes,
                children,
            ),
            Content::Sequence(items) => {
                for item in items {
                    self.materialize(parent, item, nodes, children)?;
                }
                Ok(())
            }
        }
    }

    fn render_child(
        &self,
        parent: &View,
        child: Child,
        nodes: &mut Vec<RenderedNode>,
        children: &mut Vec<Child>,
    ) -> Result<()> {
        let view = child.view.clone();
        nodes.push(RenderedNode::View(view.id()));
        children.push(child);
        self.render(&view, Some(parent)).map(|_| ())
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("runtime", &self.inner.runtime)
            .field("document", &self.inner.document)
            .finish()
    }
}

fn upgrade(weak: &Weak<RendererInner>) -> Option<Renderer> {
    weak.upgrade().map(|inner| Renderer { inner })
}

fn dispose(child: Child) {
    match child.owner {
        Some(owner) if owner.view().as_ref() == Some(&child.view) => owner.destroy(),
        _ => Renderer::destroy_view(&child.view),
    }
}

/// Build the view for an inclusion. Arguments get their own binding scope
/// directly above the template view.
fn inclusion_view(inclusion: Inclusion) -> View {
    let Inclusion {
        template,
        args,
        content,
        else_content,
    } = inclusion;

    match args {
        None => {
            let view = View::for_template(&template);
            view.set_blocks(content, else_content);
            view
        }
        Some(args) => {
            let render: Arc<RenderFn> = Arc::new(move |_: &View, _: &Tracker| -> Result<Content> {
                let view = View::for_template(&template);
                view.set_blocks(content.clone(), else_content.clone());
                Ok(Content::View(view))
            });
            View::template_with(args, render)
        }
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicI32, Ordering};

    fn renderer() -> Renderer {
        Renderer::new(Runtime::new(), Document::with_mount_points(["body"]))
    }

    #[test]
    fn hooks_fire_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let view = View::new("v", |_, _| Ok(Content::text("hi")));
        for hook in Hook::ALL {
            let log = log.clone();
            view.on(hook, move |_| log.lock().push(hook.name()));
        }

        let range = renderer().render(&view, None).unwrap();
        assert_eq!(range.view().text(), "hi");
        Renderer::destroy_view(&view);

        assert_eq!(
            *log.lock(),
            vec!["onCreated", "onMaterialized", "onRendered", "onDestroyed"]
        );
    }

    #[test]
    fn invalidation_re_renders_on_flush() {
        let renderer = renderer();
        let count = Signal::new(1);
        let rendered = Arc::new(AtomicI32::new(0));

        let reader = count.clone();
        let view = View::new("counter", move |_, tracker| {
            Ok(Content::text(format!("count={}", reader.get(tracker))))
        });
        let counter = rendered.clone();
        view.on(Hook::Rendered, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        renderer.render(&view, None).unwrap();
        assert_eq!(view.text(), "count=1");

        count.set(2);
        assert_eq!(view.text(), "count=1");
        assert_eq!(renderer.flush(), 1);
        assert_eq!(view.text(), "count=2");
        assert_eq!(rendered.load(Ordering::SeqCst), 2);

        count.set(2);
        assert_eq!(renderer.flush(), 0);
    }

    #[test]
    fn destroyed_view_ignores_pending_re_render() {
        let renderer = renderer();
        let count = Signal::new(0);
        let reader = count.clone();
        let view = View::new("v", move |_, tracker| Ok(Content::text(reader.get(tracker).to_string())));

        renderer.render(&view, None).unwrap();
        count.set(1);
        Renderer::destroy_view(&view);

        assert_eq!(renderer.flush(), 0);
        assert_eq!(view.text(), "0");
    }

    #[test]
    fn re_render_destroys_old_children() {
        let renderer = renderer();
        let toggle = Signal::new(false);
        let reader = toggle.clone();
        let root = View::new("root", move |_, tracker| {
            let label = if reader.get(tracker) { "b" } else { "a" };
            Ok(Content::View(View::new(label, move |_, _| Ok(Content::text(label)))))
        });

        renderer.render(&root, None).unwrap();
        let first = root.children()[0].clone();
        assert_eq!(root.text(), "a");

        toggle.set(true);
        renderer.flush();
        assert!(first.is_destroyed());
        assert_eq!(root.text(), "b");
        assert_eq!(root.children()[0].parent(), Some(root.clone()));
    }

    #[test]
    fn data_scope_feeds_descendants() {
        let renderer = renderer();
        let name = Signal::new(json!("Ada"));
        let source = name.clone();

        let scope = View::with_data(
            move |tracker| Ok(Some(source.get(tracker))),
            |_, _| {
                Ok(Content::View(View::new("greeting", |view, tracker| {
                    let scope = view.parent();
                    let value = scope
                        .and_then(|s| s.data_var().cloned())
                        .and_then(|var| var.get(tracker))
                        .unwrap_or(Value::Null);
                    Ok(Content::text(format!("hello {}", value.as_str().unwrap_or("?"))))
                })))
            },
        );

        renderer.render(&scope, None).unwrap();
        assert_eq!(scope.text(), "hello Ada");

        name.set(json!("Grace"));
        renderer.flush();
        assert_eq!(scope.text(), "hello Grace");
    }

    #[test]
    fn initial_render_error_is_returned() {
        let view = View::new("broken", |_, _| Err(ComponentError::Handler("nope".into())));
        let err = renderer().render(&view, None).unwrap_err();
        assert_eq!(err, ComponentError::Handler("nope".into()));
        assert!(!view.is_rendered());
        assert_eq!(view.last_error(), Some(err));
    }

    #[test]
    fn re_render_error_is_recorded_on_the_view() {
        let renderer = renderer();
        let fail = Signal::new(false);
        let reader = fail.clone();
        let view = View::new("v", move |_, tracker| {
            if reader.get(tracker) {
                Err(ComponentError::Handler("late".into()))
            } else {
                Ok(Content::text("ok"))
            }
        });

        renderer.render(&view, None).unwrap();
        fail.set(true);
        renderer.flush();
        assert_eq!(view.last_error(), Some(ComponentError::Handler("late".into())));

        fail.set(false);
        renderer.flush();
        assert_eq!(view.last_error(), None);
        assert_eq!(view.text(), "ok");
    }

    #[test]
    fn rendering_twice_is_rejected() {
        let renderer = renderer();
        let view = View::new("v", |_, _| Ok(Content::Empty));
        renderer.render(&view, None).unwrap();
        assert!(matches!(
            renderer.render(&view, None),
            Err(ComponentError::Precondition(_))
        ));
    }

    #[test]
    fn mount_resolves_default_and_missing_targets() {
        let renderer = renderer();
        let view = View::new("v", |_, _| Ok(Content::Empty));
        let range = renderer.mount(&view, None).unwrap();
        assert!(range.is_attached());

        let other = View::new("w", |_, _| Ok(Content::Empty));
        let err = renderer.mount(&other, Some("#nope")).unwrap_err();
        assert_eq!(
            err,
            ComponentError::MissingMountPoint {
                selector: "#nope".into()
            }
        );
        assert!(!other.is_created());
    }

    #[test]
    fn destroy_detaches_from_mount_point() {
        let renderer = renderer();
        let view = View::new("v", |_, _| Ok(Content::Empty));
        renderer.mount(&view, None).unwrap();
        let body = renderer.mount_point(None).unwrap();
        assert!(body.contains(&view));

        Renderer::destroy_view(&view);
        assert!(!body.contains(&view));
    }
}
