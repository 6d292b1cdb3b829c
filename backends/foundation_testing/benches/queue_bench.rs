use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use foundation_osal::queue::SyncQueue;
use foundation_osal::ring::RingBuffer;
use foundation_osal::{MutexKind, OsMutex, NO_WAIT, WAIT_FOREVER};
use std::sync::Arc;
use std::thread;

/// Send then receive on one thread, no contention.
fn bench_queue_uncontended(c: &mut Criterion) {
    let queue = SyncQueue::create(16, 8, "bench-uncontended").unwrap();
    let mut out = [0u8; 8];

    c.bench_function("queue_send_receive_uncontended", |b| {
        b.iter(|| {
            queue.send(black_box(&42u64.to_le_bytes()), NO_WAIT).unwrap();
            queue.receive(&mut out, NO_WAIT).unwrap();
            black_box(out);
        });
    });
}

/// Raw ring buffer push/pop without any locking.
fn bench_ring_push_pop(c: &mut Criterion) {
    let mut ring = RingBuffer::init_owned(64, 8).unwrap();
    let mut out = [0u8; 8];

    c.bench_function("ring_push_pop", |b| {
        b.iter(|| {
            ring.push(black_box(&7u64.to_le_bytes())).unwrap();
            ring.pop(&mut out).unwrap();
            black_box(out);
        });
    });
}

/// 1000 items from one producer to one consumer, scaling the capacity.
fn bench_queue_spsc_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_spsc_1000_items");

    for capacity in [1usize, 8, 64] {
        group.bench_function(format!("capacity_{capacity}"), |b| {
            b.iter_batched(
                || SyncQueue::create(capacity, 8, "bench-spsc").unwrap(),
                |queue| {
                    let producer = {
                        let queue = Arc::clone(&queue);
                        thread::spawn(move || {
                            for value in 0..1000u64 {
                                queue.send(&value.to_le_bytes(), WAIT_FOREVER).unwrap();
                            }
                        })
                    };

                    let mut out = [0u8; 8];
                    for _ in 0..1000 {
                        queue.receive(&mut out, WAIT_FOREVER).unwrap();
                    }
                    producer.join().unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Non-blocking take/give on an uncontended mutex.
fn bench_mutex_take_give(c: &mut Criterion) {
    let mutex = OsMutex::create("bench-mutex", MutexKind::Normal).unwrap();
    let recursive = OsMutex::create("bench-recursive", MutexKind::Recursive).unwrap();

    let mut group = c.benchmark_group("mutex_take_give");
    group.bench_function("normal", |b| {
        b.iter(|| {
            mutex.try_take().unwrap();
            mutex.give().unwrap();
        });
    });
    group.bench_function("recursive_depth_2", |b| {
        b.iter(|| {
            recursive.try_take().unwrap();
            recursive.try_take().unwrap();
            recursive.give().unwrap();
            recursive.give().unwrap();
        });
    });
    group.finish();
}

/// Cost of a 1ms timed receive on an empty queue.
fn bench_queue_timeout(c: &mut Criterion) {
    let queue = SyncQueue::create(1, 8, "bench-timeout").unwrap();
    let mut out = [0u8; 8];

    c.bench_function("queue_receive_timeout_1ms", |b| {
        b.iter(|| {
            black_box(queue.receive(&mut out, 1).is_err());
        });
    });
}

criterion_group!(
    benches,
    bench_queue_uncontended,
    bench_ring_push_pop,
    bench_queue_spsc_capacity,
    bench_mutex_take_give,
    bench_queue_timeout
);
criterion_main!(benches);
