// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{Matrix4, Vector3};
use polyframe_csg::geometry::{evaluate_batch, prepare_all, BatchJob};
use polyframe_csg::{BooleanOp, Brush, CsgConfig, Evaluator, Primitive};

fn sphere_brush(segments: u32, offset: f64) -> Brush {
    Brush::new(Primitive::sphere(1.0, segments).to_buffer())
        .unwrap()
        .with_transform(Matrix4::new_translation(&Vector3::new(offset, 0.0, 0.0)))
}

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare");
    let config = CsgConfig::default();

    for segments in [16, 32, 64] {
        group.bench_with_input(BenchmarkId::new("sphere", segments), &segments, |b, &segments| {
            b.iter(|| {
                let mut brush = sphere_brush(segments, 0.0);
                brush.prepare(black_box(&config)).unwrap();
                brush
            });
        });
    }

    group.finish();
}

fn bench_boolean(c: &mut Criterion) {
    let mut group = c.benchmark_group("boolean");
    let config = CsgConfig::default();

    for segments in [16, 32, 64] {
        let mut a = sphere_brush(segments, 0.0);
        let mut b = sphere_brush(segments, 0.7);
        a.prepare(&config).unwrap();
        b.prepare(&config).unwrap();

        for op in [BooleanOp::Union, BooleanOp::Subtract, BooleanOp::Intersect] {
            let mut evaluator = Evaluator::new(config.clone());
            group.bench_with_input(BenchmarkId::new(op.name(), segments), &op, |bench, &op| {
                bench.iter(|| evaluator.evaluate_prepared(&a, &b, black_box(op)).unwrap());
            });
        }

        let mut evaluator = Evaluator::new(config.clone());
        let id = BenchmarkId::new("all_ops", segments);
        group.bench_with_input(id, &BooleanOp::ALL, |bench, ops| {
            bench.iter(|| evaluator.evaluate_prepared_many(&a, &b, black_box(ops)).unwrap());
        });
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let config = CsgConfig::default();
    let mut brushes: Vec<Brush> = (0..8).map(|i| sphere_brush(32, i as f64 * 0.25)).collect();
    prepare_all(&mut brushes, &config).unwrap();

    c.bench_function("batch_8_pairs", |b| {
        b.iter(|| {
            let jobs: Vec<BatchJob<'_>> = brushes
                .iter()
                .zip(brushes.iter().cycle().skip(1))
                .map(|(a, b)| BatchJob::new(a, b, vec![BooleanOp::Union, BooleanOp::Subtract]))
                .collect();
            evaluate_batch(black_box(&jobs), &config)
        });
    });
}

criterion_group!(benches, bench_prepare, bench_boolean, bench_batch);
criterion_main!(benches);
