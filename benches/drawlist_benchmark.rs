//! Drawlist benchmark: Measure command encoding and build.
//!
//! Target: < 100µs to encode and build 2,000 text commands

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use weft::drawlist::{merge_styles, Builder, DrawlistBuilder, DrawlistVersion, Rgb, TextStyle};
use weft::Rect;

fn styles() -> Vec<TextStyle> {
    (0..16u8)
        .map(|i| TextStyle {
            fg: Some(Rgb::new(i * 16, 255 - i * 16, 128)),
            bold: Some(i % 2 == 0),
            ..TextStyle::default()
        })
        .collect()
}

fn encode_text_frame(c: &mut Criterion) {
    let styles = styles();
    let lines: Vec<String> = (0..50).map(|i| format!("line {i}: the quick brown fox")).collect();
    let mut builder = Builder::new(DrawlistVersion::LATEST);

    c.bench_function("drawlist_2000_text", |b| {
        b.iter(|| {
            builder.reset();
            builder.clear_to(200, 50, &TextStyle::default());
            for i in 0..2000 {
                let line = &lines[i % lines.len()];
                builder.draw_text((i % 40) as i32, (i % 50) as i32, line, &styles[i % styles.len()]);
            }
            builder.build().map(<[u8]>::len)
        })
    });
}

fn encode_clipped_fills(c: &mut Criterion) {
    let style = TextStyle::bg(Rgb::new(30, 30, 40));
    let mut builder = Builder::new(DrawlistVersion::LATEST);

    c.bench_function("drawlist_nested_clips", |b| {
        b.iter(|| {
            builder.reset();
            for depth in 0..32 {
                builder.push_clip(Rect::new(depth, depth, 200 - depth * 2, 50));
                builder.fill_rect(Rect::new(0, 0, 200, 50), black_box(&style));
            }
            for _ in 0..32 {
                builder.pop_clip();
            }
            builder.build().map(<[u8]>::len)
        })
    });
}

fn keyed_blob_reuse(c: &mut Criterion) {
    let pixels = vec![0x7fu8; 64 * 64 * 4];
    let mut builder = Builder::new(DrawlistVersion::V3);

    c.bench_function("drawlist_keyed_blob_hit", |b| {
        b.iter(|| {
            builder.reset();
            builder.add_blob_keyed("canvas/1", 1, &mut |out: &mut Vec<u8>| {
                out.extend_from_slice(black_box(&pixels));
            })
        })
    });
}

fn style_merge(c: &mut Criterion) {
    let styles = styles();

    c.bench_function("style_merge_4", |b| {
        b.iter(|| merge_styles(black_box(&styles[..4]).iter().map(Some)))
    });
}

criterion_group!(
    benches,
    encode_text_frame,
    encode_clipped_fills,
    keyed_blob_reuse,
    style_merge,
);
criterion_main!(benches);
