//! Layout benchmark: Measure a full layout pass over a dashboard-sized tree.
//!
//! Target: < 200µs for 200×50 with ~500 nodes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use weft::layout::{Axis, LayoutEngine};
use weft::tree::{StackProps, TextProps, VNode};
use weft::Rect;

/// Rows of labelled cells, every third one wrapping.
fn dashboard(rows: usize, cols: usize) -> VNode {
    VNode::column(
        (0..rows)
            .map(|r| {
                VNode::row(
                    (0..cols)
                        .map(|c| {
                            VNode::new(TextProps {
                                content: format!("cell {r}:{c} with some words to wrap"),
                                wrap: c % 3 == 0,
                                layout: weft::tree::LayoutProps::flex(1.0),
                                ..TextProps::default()
                            })
                        })
                        .collect(),
                )
            })
            .collect(),
    )
}

fn layout_dashboard(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_dashboard");
    for (rows, cols) in [(10, 5), (50, 10)] {
        let tree = dashboard(rows, cols);
        let mut engine = LayoutEngine::new();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{rows}x{cols}")),
            &tree,
            |b, tree| b.iter(|| engine.layout(black_box(tree), 0, 0, 200, 50, Axis::Vertical)),
        );
    }
    group.finish();
}

fn layout_wrapping_row(c: &mut Criterion) {
    let row = VNode::new(weft::tree::Props::Row(StackProps {
        wrap: true,
        gap: 1,
        line_gap: 1,
        ..StackProps::default()
    }))
    .with_children((0..200).map(|i| VNode::text(format!("tag-{i}"))).collect());
    let mut engine = LayoutEngine::new();

    c.bench_function("layout_wrapping_row_200", |b| {
        b.iter(|| engine.layout(black_box(&row), 0, 0, 120, 60, Axis::Vertical))
    });
}

fn rect_intersection(c: &mut Criterion) {
    let a = Rect::new(10, 10, 100, 40);
    let b = Rect::new(50, 20, 100, 40);

    c.bench_function("rect_intersection", |bench| {
        bench.iter(|| black_box(&a).intersection(black_box(&b)))
    });
}

criterion_group!(benches, layout_dashboard, layout_wrapping_row, rect_intersection);
criterion_main!(benches);
