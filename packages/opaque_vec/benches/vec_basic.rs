//! Basic benchmarks for the `opaque_vec` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::alloc::Layout;
use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use opaque_vec::OpaqueVec;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = usize;
const TEST_VALUE: TestItem = 1024;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("vec_basic");

    let allocs_op = allocs.operation("build_empty");
    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let layout = Layout::new::<TestItem>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(OpaqueVec::builder().layout(layout).build()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("push_one");
    group.bench_function("push_one", |b| {
        b.iter_custom(|iters| {
            let layout = Layout::new::<TestItem>();

            let mut vecs = iter::repeat_with(|| OpaqueVec::builder().layout(layout).build())
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for vec in &mut vecs {
                // SAFETY: The layout of TestItem matches the vec's layout.
                _ = black_box(unsafe { vec.push(black_box(TEST_VALUE)) });
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("read_one");
    group.bench_function("read_one", |b| {
        b.iter_custom(|iters| {
            let layout = Layout::new::<TestItem>();

            let mut vec = OpaqueVec::builder().layout(layout).build();

            // SAFETY: The layout of TestItem matches the vec's layout.
            let index = unsafe { vec.push(TEST_VALUE) }.unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                // SAFETY: The layout of TestItem matches the vec's layout and the slot
                // holds an initialized value.
                _ = black_box(*unsafe { vec.get::<TestItem>(black_box(index)) }.unwrap());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("remove_unordered_one");
    group.bench_function("remove_unordered_one", |b| {
        b.iter_custom(|iters| {
            let layout = Layout::new::<TestItem>();

            let mut vecs = iter::repeat_with(|| {
                let mut vec = OpaqueVec::builder().layout(layout).build();
                // SAFETY: The layout of TestItem matches the vec's layout.
                _ = unsafe { vec.push(TEST_VALUE) }.unwrap();
                vec
            })
            .take(usize::try_from(iters).unwrap())
            .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for vec in &mut vecs {
                vec.remove_unordered(0).unwrap();
            }

            start.elapsed()
        });
    });

    group.finish();

    let mut group = c.benchmark_group("vec_slow");

    let allocs_op = allocs.operation("push_10k");
    group.bench_function("push_10k", |b| {
        b.iter_custom(|iters| {
            let layout = Layout::new::<TestItem>();

            let mut vecs = iter::repeat_with(|| OpaqueVec::builder().layout(layout).build())
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for vec in &mut vecs {
                for _ in 0..10_000 {
                    // SAFETY: The layout of TestItem matches the vec's layout.
                    _ = black_box(unsafe { vec.push(black_box(TEST_VALUE)) });
                }
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("remove_ordered_front_1k");
    group.bench_function("remove_ordered_front_1k", |b| {
        b.iter_custom(|iters| {
            let layout = Layout::new::<TestItem>();

            let mut vecs = iter::repeat_with(|| {
                let mut vec = OpaqueVec::builder().layout(layout).build();
                for _ in 0..1_000 {
                    // SAFETY: The layout of TestItem matches the vec's layout.
                    _ = unsafe { vec.push(TEST_VALUE) }.unwrap();
                }
                vec
            })
            .take(usize::try_from(iters).unwrap())
            .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for vec in &mut vecs {
                vec.remove_ordered(0).unwrap();
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
