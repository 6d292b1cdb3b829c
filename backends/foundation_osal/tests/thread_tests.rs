//! Threads, mutexes and queues used together the way collaborators use them:
//! create, take/give, send/receive, sleep, join.

use foundation_osal::mutex::{MutexKind, OsMutex};
use foundation_osal::queue::SyncQueue;
use foundation_osal::thread::{self, Priority, Thread, ThreadAttributes};
use foundation_osal::time::WAIT_FOREVER;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_test::traced_test;

struct Worker {
    queue: Arc<SyncQueue>,
    mutex: Arc<OsMutex>,
    shared: Arc<AtomicUsize>,
    id: u32,
}

fn worker_entry(worker: Worker) {
    for round in 0..50u32 {
        worker
            .queue
            .send(&(worker.id * 100 + round).to_le_bytes(), WAIT_FOREVER)
            .unwrap();

        let _guard = worker.mutex.lock().unwrap();
        let seen = worker.shared.load(Ordering::SeqCst);
        thread::yield_now();
        worker.shared.store(seen + 1, Ordering::SeqCst);
    }
}

/// `WHY`: The three primitives must compose without lost updates or items
/// `WHAT`: Three entry-point threads feed a queue and bump a counter under a
/// mutex; the main thread drains every item and the counter is exact
#[test]
#[traced_test]
#[ntest::timeout(20000)]
fn workers_feed_queue_under_mutex() {
    let queue = SyncQueue::create(4, 4, "work").unwrap();
    let mutex = OsMutex::create("counter", MutexKind::Normal).unwrap();
    let shared = Arc::new(AtomicUsize::new(0));

    let workers: Vec<Thread> = (0..3u32)
        .map(|id| {
            let worker = Worker {
                queue: Arc::clone(&queue),
                mutex: Arc::clone(&mutex),
                shared: Arc::clone(&shared),
                id,
            };
            let attributes = ThreadAttributes::new()
                .with_name(&format!("worker-{id}"))
                .with_priority(Priority::LOW);
            Thread::create(worker_entry, worker, attributes).unwrap()
        })
        .collect();

    let mut out = [0u8; 4];
    let mut received = Vec::new();
    for _ in 0..150 {
        queue.receive(&mut out, WAIT_FOREVER).unwrap();
        received.push(u32::from_le_bytes(out));
    }

    for worker in workers {
        assert_eq!(worker.priority(), Priority::LOW);
        worker.join().unwrap();
    }

    assert_eq!(shared.load(Ordering::SeqCst), 150);
    received.sort_unstable();
    let mut expected: Vec<u32> = (0..3u32)
        .flat_map(|id| (0..50u32).map(move |round| id * 100 + round))
        .collect();
    expected.sort_unstable();
    assert_eq!(received, expected);
    assert!(logs_contain("Spawned thread"));
}

/// `WHY`: A detached thread must keep running and finish on its own
/// `WHAT`: After `destroy`, the thread still delivers its item
#[test]
#[ntest::timeout(5000)]
fn destroyed_thread_runs_to_completion() {
    let queue = SyncQueue::create(1, 1, "detached").unwrap();
    let sender = Arc::clone(&queue);

    let thread = Thread::spawn(ThreadAttributes::new().with_name("detached"), move || {
        thread::sleep_ms(20).unwrap();
        sender.send(&[42], WAIT_FOREVER).unwrap();
    })
    .unwrap();
    thread.destroy();

    let mut out = [0u8; 1];
    queue.receive(&mut out, WAIT_FOREVER).unwrap();
    assert_eq!(out, [42]);
}
