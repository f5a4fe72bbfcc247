//! Queue and pool throughput benchmarks
//!
//! - single-thread push/pop cycling
//! - multi-producer contention feeding one consumer
//! - buffer pool pop/return cycling
//! - raw contended fetch-add, as a ceiling for the reservation path

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use oxiread::pool::BufferPool;
use oxiread::sync::BoundedQueue;

fn bench_spsc_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue/spsc_cycle");
    group.throughput(Throughput::Elements(1));
    group.bench_function("push_pop", |b| {
        let q = BoundedQueue::with_capacity(64);
        b.iter(|| {
            q.push(black_box(1u64));
            black_box(q.pop());
        });
    });
    group.finish();
}

fn bench_mpsc_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue/mpsc");
    const PER_PRODUCER: u64 = 10_000;

    for producers in [1u64, 2, 4] {
        group.throughput(Throughput::Elements(producers * PER_PRODUCER));
        group.bench_with_input(
            BenchmarkId::from_parameter(producers),
            &producers,
            |b, &producers| {
                b.iter(|| {
                    let total = (producers * PER_PRODUCER) as usize;
                    let q = Arc::new(BoundedQueue::with_capacity(total));

                    let handles: Vec<_> = (0..producers)
                        .map(|p| {
                            let q = Arc::clone(&q);
                            thread::spawn(move || {
                                for i in 0..PER_PRODUCER {
                                    q.push(p * PER_PRODUCER + i);
                                }
                            })
                        })
                        .collect();

                    let mut sum = 0u64;
                    for _ in 0..producers * PER_PRODUCER {
                        sum = sum.wrapping_add(q.pop());
                    }
                    for h in handles {
                        h.join().unwrap();
                    }
                    black_box(sum)
                });
            },
        );
    }
    group.finish();
}

fn bench_pool_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool/cycle");
    group.throughput(Throughput::Elements(1));
    group.bench_function("pop_drop", |b| {
        let pool = BufferPool::new(4, 64 * 1024, 4096).unwrap();
        b.iter(|| {
            let token = pool.pop();
            black_box(token.id());
        });
    });
    group.bench_function("pop_release_reacquire", |b| {
        let pool = BufferPool::new(4, 64 * 1024, 4096).unwrap();
        b.iter(|| {
            let id = pool.pop().release();
            drop(pool.reacquire(black_box(id)));
        });
    });
    group.finish();
}

fn bench_contended_fetch_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomics/fetch_add");
    const OPS: u64 = 100_000;

    for threads in [1usize, 2, 4] {
        group.throughput(Throughput::Elements(threads as u64 * OPS));
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let counter = Arc::new(AtomicU64::new(0));
                    let handles: Vec<_> = (0..threads)
                        .map(|_| {
                            let counter = Arc::clone(&counter);
                            thread::spawn(move || {
                                for _ in 0..OPS {
                                    counter.fetch_add(1, Ordering::AcqRel);
                                }
                            })
                        })
                        .collect();
                    for h in handles {
                        h.join().unwrap();
                    }
                    black_box(counter.load(Ordering::Acquire))
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_spsc_cycle,
    bench_mpsc_contention,
    bench_pool_cycle,
    bench_contended_fetch_add
);
criterion_main!(benches);
