//! Benchmarks for skeleton build and pose frame decode

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use marionette_skeleton::{SharedHierarchy, SkeletonHierarchy, Trs};
use marionette_test::{animated_frame, chain_definition, humanoid_definition};
use marionette_wire::{decode, PoseFrameView};

fn bench_build(c: &mut Criterion) {
    let humanoid = humanoid_definition();
    c.bench_function("build_humanoid", |b| {
        b.iter(|| SkeletonHierarchy::build(black_box(&humanoid)).unwrap())
    });

    let chain = chain_definition(256);
    c.bench_function("build_chain_256", |b| {
        b.iter(|| SkeletonHierarchy::build(black_box(&chain)).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for bones in [25usize, 64, 256] {
        let mut hierarchy = SkeletonHierarchy::build(&chain_definition(bones)).unwrap();
        let frame = animated_frame(bones, 0.5);
        group.bench_with_input(BenchmarkId::from_parameter(bones), &frame, |b, frame| {
            b.iter(|| decode(black_box(frame), &mut hierarchy).unwrap())
        });
    }
    group.finish();
}

fn bench_decode_shared(c: &mut Criterion) {
    let shared = SharedHierarchy::new(SkeletonHierarchy::build(&humanoid_definition()).unwrap());
    let frame = animated_frame(25, 1.0);
    c.bench_function("decode_shared_humanoid", |b| {
        b.iter(|| shared.with(|h| decode(black_box(&frame), h).unwrap()))
    });
}

fn bench_decompose(c: &mut Criterion) {
    let frame = animated_frame(1, 0.7);
    let matrix = PoseFrameView::new(&frame).matrix(0).unwrap();
    c.bench_function("trs_from_matrix", |b| b.iter(|| Trs::from_matrix(black_box(&matrix))));
}

criterion_group!(benches, bench_build, bench_decode, bench_decode_shared, bench_decompose);
criterion_main!(benches);
