//! Pipeline benchmark: Full commit → layout → encode frames.
//!
//! Target: < 1ms per changed frame for a 200×50 screen

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use weft::tree::{Border, BoxProps};
use weft::{IgnoreEffects, InstanceTree, Pipeline, VNode};

/// A log pane with `lines` entries and a footer of buttons.
fn screen(lines: usize, tick: usize) -> VNode {
    VNode::column(vec![
        VNode::boxed(
            BoxProps {
                border: Border::Rounded,
                title: Some(format!("log ({tick})")),
                ..BoxProps::default()
            },
            (0..lines)
                .map(|i| VNode::text(format!("[{i:04}] request served")).with_key(i.to_string()))
                .collect(),
        ),
        VNode::row(vec![VNode::button("Retry"), VNode::spacer(), VNode::button("Quit")]),
    ])
}

fn commit_unchanged(c: &mut Criterion) {
    let tree = screen(40, 0);
    let mut instances = InstanceTree::new();
    weft::commit(&mut instances, &tree, &mut IgnoreEffects).ok();

    c.bench_function("commit_40_unchanged", |b| {
        b.iter(|| weft::commit(&mut instances, black_box(&tree), &mut IgnoreEffects))
    });
}

fn frame_changed(c: &mut Criterion) {
    let trees = [screen(40, 0), screen(40, 1)];
    let mut pipeline = Pipeline::default();
    let mut tick = 0;

    c.bench_function("frame_200x50_title_change", |b| {
        b.iter(|| {
            tick += 1;
            let tree = &trees[tick % 2];
            pipeline
                .frame(black_box(tree), 200, 50, &mut IgnoreEffects)
                .map(|outcome| outcome.bytes().map_or(0, <[u8]>::len))
        })
    });
}

fn frame_unchanged(c: &mut Criterion) {
    let tree = screen(40, 0);
    let mut pipeline = Pipeline::default();
    pipeline.frame(&tree, 200, 50, &mut IgnoreEffects).ok();

    c.bench_function("frame_200x50_unchanged", |b| {
        b.iter(|| pipeline.frame(black_box(&tree), 200, 50, &mut IgnoreEffects).is_ok())
    });
}

criterion_group!(benches, commit_unchanged, frame_changed, frame_unchanged);
criterion_main!(benches);
