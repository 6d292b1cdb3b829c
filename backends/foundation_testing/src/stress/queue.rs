//! Stress runners for `SyncQueue` and `OsMutex`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use foundation_osal::queue::SyncQueue;
use foundation_osal::primitives::CondVarMutex;
use foundation_osal::thread::{self, Thread, ThreadAttributes};
use foundation_osal::{MutexKind, OsMutex, OsalError, OsalResult, WAIT_FOREVER};

use crate::stress::{StressConfig, StressHarness, StressResult};

/// Byte width of the items the queue runners move around.
pub const ITEM_SIZE: usize = 8;

/// Runs a producer-consumer stress test over one shared queue.
///
/// Even thread ids send, odd ones receive, every call bounded by the
/// configured timeout. Once all workers finish, items sent must equal items
/// received plus items still queued; any difference is counted as failures.
///
/// # Examples
///
/// ```
/// use foundation_testing::stress::{queue::run_queue_producer_consumer_stress, StressConfig};
///
/// let config = StressConfig::new().threads(4).iterations(500).queue_capacity(8);
/// let result = run_queue_producer_consumer_stress(config);
///
/// assert!(result.success_rate() > 0.99);
/// ```
///
/// # Panics
///
/// Panics if the queue cannot be created.
#[must_use]
pub fn run_queue_producer_consumer_stress(config: StressConfig) -> StressResult {
    let queue = SyncQueue::create(config.get_queue_capacity(), ITEM_SIZE, "stress-pc")
        .expect("stress queue");
    let sent = Arc::new(AtomicUsize::new(0));
    let received = Arc::new(AtomicUsize::new(0));
    let timeout_ms = config.get_timeout_ms();

    let result = {
        let queue = Arc::clone(&queue);
        let sent = Arc::clone(&sent);
        let received = Arc::clone(&received);

        StressHarness::new(config).run(move |thread_id, iteration| {
            if thread_id % 2 == 0 {
                let item = ((thread_id as u64) << 32) | iteration as u64;
                let ok = queue.send(&item.to_le_bytes(), timeout_ms).is_ok();
                if ok {
                    sent.fetch_add(1, Ordering::Relaxed);
                }
                ok
            } else {
                let mut out = [0u8; ITEM_SIZE];
                let ok = queue.receive(&mut out, timeout_ms).is_ok();
                if ok {
                    received.fetch_add(1, Ordering::Relaxed);
                }
                ok
            }
        })
    };

    let accounted = received.load(Ordering::Relaxed) + queue.count();
    let lost = sent.load(Ordering::Relaxed).abs_diff(accounted);
    if lost > 0 {
        tracing::warn!("Queue stress lost track of {lost} items");
    }
    queue.destroy();
    result.demote(lost)
}

/// Runs a lock contention stress test on one non-recursive `OsMutex`.
///
/// Each iteration takes the mutex, does an unsynchronized read-modify-write
/// on a shared counter and gives the mutex back. Updates lost to a broken
/// lock show up as failures.
///
/// # Panics
///
/// Panics if the mutex cannot be created.
#[must_use]
pub fn run_mutex_contention_stress(config: StressConfig) -> StressResult {
    let mutex = OsMutex::create("stress-mutex", MutexKind::Normal).expect("stress mutex");
    let counter = Arc::new(AtomicUsize::new(0));
    let timeout_ms = config.get_timeout_ms();

    let result = {
        let mutex = Arc::clone(&mutex);
        let counter = Arc::clone(&counter);

        StressHarness::new(config).run(move |_thread_id, iteration| {
            if mutex.take_timeout(timeout_ms).is_err() {
                return false;
            }

            let seen = counter.load(Ordering::Relaxed);
            if iteration % 16 == 0 {
                thread::yield_now();
            }
            counter.store(seen + 1, Ordering::Relaxed);

            mutex.give().is_ok()
        })
    };

    let lost = result
        .successes
        .saturating_sub(counter.load(Ordering::Relaxed));
    mutex.destroy();
    result.demote(lost)
}

/// Hammers an empty queue with short timed receives.
///
/// Iteration `i` waits `1 + i % 5` ms. It succeeds only if the receive
/// reports [`OsalError::Timeout`] and did not return before its deadline.
///
/// # Panics
///
/// Panics if the queue cannot be created.
#[must_use]
pub fn run_queue_timeout_stress(config: StressConfig) -> StressResult {
    let queue = SyncQueue::create(1, ITEM_SIZE, "stress-timeout").expect("stress queue");

    let result = {
        let queue = Arc::clone(&queue);
        StressHarness::new(config).run(move |_thread_id, iteration| {
            let wait_ms = 1 + u32::try_from(iteration % 5).unwrap_or(0);
            let mut out = [0u8; ITEM_SIZE];

            let started = Instant::now();
            let outcome = queue.receive(&mut out, wait_ms);
            let elapsed = started.elapsed();

            outcome == Err(OsalError::Timeout)
                && elapsed >= Duration::from_millis(u64::from(wait_ms))
        })
    };

    queue.destroy();
    result
}

/// Creates and destroys queues while a receiver is blocked on them.
///
/// Every iteration must see the receiver released with
/// [`OsalError::Destroyed`].
///
/// # Panics
///
/// Panics if a helper thread cannot be joined.
#[must_use]
pub fn run_queue_teardown_stress(config: StressConfig) -> StressResult {
    StressHarness::new(config).run(move |thread_id, iteration| {
        let name = format!("teardown-{thread_id}-{iteration}");
        let Ok(queue) = SyncQueue::create(1, ITEM_SIZE, &name) else {
            return false;
        };

        let outcome: Arc<CondVarMutex<Option<OsalResult<()>>>> =
            Arc::new(CondVarMutex::new(None));
        let receiver = {
            let queue = Arc::clone(&queue);
            let outcome = Arc::clone(&outcome);
            let attributes = ThreadAttributes::new().with_name(&format!("{name}-receiver"));
            Thread::spawn(attributes, move || {
                let mut out = [0u8; ITEM_SIZE];
                *outcome.lock() = Some(queue.receive(&mut out, WAIT_FOREVER));
            })
        };
        let Ok(receiver) = receiver else {
            queue.destroy();
            return false;
        };

        if iteration % 2 == 0 {
            thread::yield_now();
        }
        queue.destroy();

        receiver.join().expect("teardown receiver panicked");
        let destroyed = outcome.lock().take() == Some(Err(OsalError::Destroyed));
        destroyed
    })
}
