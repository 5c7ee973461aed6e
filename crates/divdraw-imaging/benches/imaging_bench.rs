// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the divdraw-imaging crate. Covers the full sketch
// extraction pipeline at the working resolution and the lean scoring path.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use divdraw_imaging::codec::encode_png;
use divdraw_imaging::{BinarizeProfile, binarize, evaluate};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Pale paper with a dark grid and a diagonal stroke, roughly what a phone
/// photo of a line drawing reduces to.
fn synthetic_drawing(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let grid = x % 64 < 3 || y % 64 < 3;
        let diagonal = (x as i64 - y as i64).abs() < 4;
        if grid || diagonal {
            Rgb([35, 35, 40])
        } else {
            Rgb([215, 210, 200])
        }
    })
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Sketch profile on an 800x600 raster (no downscale), i.e. the worst case
/// that every upload is reduced to.
fn bench_sketch_pipeline(c: &mut Criterion) {
    let photo = synthetic_drawing(800, 600);
    c.bench_function("binarize sketch profile (800x600)", |b| {
        b.iter(|| black_box(binarize(black_box(&photo), BinarizeProfile::SKETCH)));
    });
}

/// Downscale from 1600x1200 followed by the sketch profile.
fn bench_sketch_with_downscale(c: &mut Criterion) {
    let photo = synthetic_drawing(1600, 1200);
    c.bench_function("binarize sketch profile (1600x1200 -> 800x600)", |b| {
        b.iter(|| black_box(binarize(black_box(&photo), BinarizeProfile::SKETCH)));
    });
}

/// End-to-end evaluation of two PNG-encoded drawings.
fn bench_evaluate(c: &mut Criterion) {
    let reference = encode_png(&DynamicImage::ImageRgb8(synthetic_drawing(640, 480)))
        .expect("encode reference");
    let user = encode_png(&DynamicImage::ImageRgb8(synthetic_drawing(600, 450)))
        .expect("encode user");
    c.bench_function("evaluate (640x480 vs 600x450)", |b| {
        b.iter(|| black_box(evaluate(black_box(&reference), black_box(&user)).expect("evaluate")));
    });
}

criterion_group!(
    benches,
    bench_sketch_pipeline,
    bench_sketch_with_downscale,
    bench_evaluate
);
criterion_main!(benches);
