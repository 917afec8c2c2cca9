//! Benchmarks for the lookup walks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use lattice_component::prelude::*;

/// A component view with `depth` plain views stacked under it. Parent
/// links are weak, so every view is returned to keep the chain alive.
fn chain(registry: &Registry, depth: usize) -> (Component, Vec<View>) {
    let class = ComponentClass::builder("Root")
        .method("answer", |_| Ok(serde_json::json!(42)))
        .build()
        .expect("class");
    let component = Component::new(registry, &class, ComponentOptions::new());
    let mut views = vec![component.create_view().expect("view")];

    for i in 0..depth {
        let view = View::new(format!("level-{i}"), |_, _| Ok(Content::Empty));
        view.set_parent(&views[views.len() - 1]);
        views.push(view);
    }
    (component, views)
}

fn bench_lookup(c: &mut Criterion) {
    let registry = Registry::new();
    let mut group = c.benchmark_group("lookup");

    for depth in [4usize, 32, 256] {
        let (_component, views) = chain(&registry, depth);
        let leaf = views[views.len() - 1].clone();

        group.bench_with_input(BenchmarkId::new("capability", depth), &leaf, |b, leaf| {
            b.iter(|| black_box(lookup(leaf, black_box("answer"))))
        });
        group.bench_with_input(BenchmarkId::new("first_component", depth), &leaf, |b, leaf| {
            b.iter(|| black_box(find_first_component(leaf)))
        });
        group.bench_with_input(BenchmarkId::new("data_context", depth), &leaf, |b, leaf| {
            let tracker = Tracker::untracked();
            b.iter(|| black_box(get_data_context(leaf, &tracker)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
