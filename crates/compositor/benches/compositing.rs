//! Compositing benchmarks.

use common::color::Color;
use common::geometry::Size;
use compositor::{BlendSettings, Compositor, CompositorSettings, LayerStack};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use overlay_media::{AssetCatalog, RasterImage};
use std::sync::Arc;

fn layer(size: Size, seed: u8) -> RasterImage {
    RasterImage::from_fn(size, |x, y| {
        Color::rgba(
            (x as u8).wrapping_add(seed),
            (y as u8).wrapping_mul(3),
            seed,
            ((x ^ y) as u8) | 0x40,
        )
    })
}

fn stack(size: Size, layers: u8) -> LayerStack {
    let mut stack = LayerStack::new(Arc::new(AssetCatalog::new()));
    for seed in 0..layers {
        stack
            .append(layer(size, seed.wrapping_mul(37)))
            .expect("generated layers are valid");
    }
    stack
}

/// Benchmark flattening stacks of increasing depth.
fn bench_stack_depth(c: &mut Criterion) {
    let compositor = Compositor::with_defaults();
    let mut group = c.benchmark_group("stack_depth");

    for layers in [2u8, 4, 8, 16] {
        let stack = stack(Size::new(256, 256), layers);
        group.bench_with_input(BenchmarkId::from_parameter(layers), &stack, |b, stack| {
            b.iter(|| black_box(compositor.composite(stack)))
        });
    }

    group.finish();
}

/// Benchmark serial against row-parallel blending.
fn bench_parallel_rows(c: &mut Criterion) {
    let stack = stack(Size::new(1024, 1024), 4);
    let serial = Compositor::from_settings(CompositorSettings::serial());
    let parallel = Compositor::from_settings(
        CompositorSettings::default().with_blend(BlendSettings::default().with_parallel_threshold(0)),
    );

    let mut group = c.benchmark_group("blend_rows");

    group.bench_function("serial", |b| {
        b.iter(|| black_box(serial.composite(&stack)))
    });

    group.bench_function("parallel", |b| {
        b.iter(|| black_box(parallel.composite(&stack)))
    });

    group.finish();
}

criterion_group!(benches, bench_stack_depth, bench_parallel_rows);
criterion_main!(benches);
