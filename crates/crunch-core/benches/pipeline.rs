//! Benchmarks for the Crunch conversion pipeline.
//!
//! Run with: cargo bench -p crunch-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crunch_core::{normalize, BaselineJpegEncoder, Encoder, Quality};
use image::DynamicImage;

fn benchmark_normalize_direct(c: &mut Criterion) {
    let img = DynamicImage::new_rgb8(1920, 1080);

    c.bench_function("normalize_rgb8_direct", |b| {
        b.iter(|| {
            let _ = normalize(black_box(&img));
        })
    });
}

fn benchmark_normalize_conversion(c: &mut Criterion) {
    let img = DynamicImage::new_rgb16(1920, 1080);

    c.bench_function("normalize_rgb16_conversion", |b| {
        b.iter(|| {
            let _ = normalize(black_box(&img));
        })
    });
}

fn benchmark_baseline_encode(c: &mut Criterion) {
    let img = DynamicImage::new_rgb8(512, 512);
    let buffer = normalize(&img);

    c.bench_function("baseline_encode_512px", |b| {
        b.iter(|| {
            let _ = BaselineJpegEncoder.encode(black_box(&buffer), Quality::DEFAULT);
        })
    });
}

criterion_group!(
    benches,
    benchmark_normalize_direct,
    benchmark_normalize_conversion,
    benchmark_baseline_encode,
);
criterion_main!(benches);
