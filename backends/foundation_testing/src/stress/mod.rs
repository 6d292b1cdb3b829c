//! Stress test framework for OSAL primitives.
//!
//! [`StressHarness`] runs a closure on several OSAL threads, either for a
//! fixed number of iterations or until a time limit, and tallies how many
//! calls reported success. The runners in [`queue`] build on it.

use core::time::Duration;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use foundation_osal::thread::{self, Thread, ThreadAttributes};

pub mod config;
pub mod queue;

pub use config::StressConfig;

/// Tally of one [`StressHarness::run`].
#[derive(Debug, Clone)]
pub struct StressResult {
    /// Calls that returned `true`
    pub successes: usize,
    /// Calls that returned `false`, plus work a runner found lost afterwards
    pub failures: usize,
    /// Wall time from the first spawn to the last join
    pub duration: Duration,
    /// Worker threads that took part
    pub thread_count: usize,
}

impl StressResult {
    /// Wraps raw counts.
    #[must_use]
    pub const fn new(
        successes: usize,
        failures: usize,
        duration: Duration,
        thread_count: usize,
    ) -> Self {
        Self {
            successes,
            failures,
            duration,
            thread_count,
        }
    }

    /// Successes plus failures.
    #[must_use]
    pub const fn total_operations(&self) -> usize {
        self.successes + self.failures
    }

    /// True when nothing failed and something ran.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failures == 0 && self.successes > 0
    }

    /// Fraction of calls that succeeded; `0.0` for an empty run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        match self.total_operations() {
            0 => 0.0,
            total => self.successes as f64 / total as f64,
        }
    }

    /// Calls per second of wall time; `0.0` when no time passed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn operations_per_second(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        self.total_operations() as f64 / self.duration.as_secs_f64()
    }

    /// Moves up to `count` successes over to failures.
    ///
    /// Used by runners that can only detect lost work after the fact.
    #[must_use]
    pub const fn demote(mut self, count: usize) -> Self {
        let count = if count > self.successes {
            self.successes
        } else {
            count
        };
        self.successes -= count;
        self.failures += count;
        self
    }
}

/// Runs one closure on many OSAL threads.
pub struct StressHarness {
    config: StressConfig,
}

impl StressHarness {
    /// Harness that will run with `config`.
    #[must_use]
    pub const fn new(config: StressConfig) -> Self {
        Self { config }
    }

    /// Runs `operation(thread_id, iteration)` on every worker.
    ///
    /// Workers are named `stress-<thread_id>`. The closure returns `true` on
    /// success. With a time limit set, workers stop at the first iteration
    /// boundary after it expires.
    ///
    /// # Examples
    ///
    /// ```
    /// use foundation_testing::stress::{StressConfig, StressHarness};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let counter = Arc::new(AtomicUsize::new(0));
    /// let config = StressConfig::new().threads(4).iterations(100);
    ///
    /// let counter_clone = Arc::clone(&counter);
    /// let result = StressHarness::new(config).run(move |_thread_id, _iteration| {
    ///     counter_clone.fetch_add(1, Ordering::Relaxed);
    ///     true
    /// });
    ///
    /// assert_eq!(counter.load(Ordering::Relaxed), 400);
    /// assert_eq!(result.successes, 400);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if a worker cannot be spawned or panics itself.
    pub fn run<F>(self, operation: F) -> StressResult
    where
        F: Fn(usize, usize) -> bool + Send + Sync + 'static,
    {
        let start = Instant::now();
        let operation = Arc::new(operation);

        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let stop_flag = Arc::new(AtomicBool::new(false));

        if let Some(limit) = self.config.get_duration() {
            let stop_flag = Arc::clone(&stop_flag);
            let limit_ms = u32::try_from(limit.as_millis()).unwrap_or(u32::MAX - 1);
            let timer = Thread::spawn(ThreadAttributes::new().with_name("stress-timer"), move || {
                let _ = thread::sleep_ms(limit_ms);
                stop_flag.store(true, Ordering::Release);
            })
            .expect("failed to spawn stress timer");
            timer.destroy();
        }

        let thread_count = self.config.get_thread_count();
        let iterations = self.config.get_iterations();
        let mut workers = Vec::with_capacity(thread_count);

        for thread_id in 0..thread_count {
            let operation = Arc::clone(&operation);
            let successes = Arc::clone(&successes);
            let failures = Arc::clone(&failures);
            let stop_flag = Arc::clone(&stop_flag);

            let attributes = ThreadAttributes::new().with_name(&format!("stress-{thread_id}"));
            let worker = Thread::spawn(attributes, move || {
                for iteration in 0..iterations {
                    if stop_flag.load(Ordering::Acquire) {
                        break;
                    }

                    if operation(thread_id, iteration) {
                        successes.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
            .expect("failed to spawn stress worker");

            workers.push(worker);
        }

        for worker in workers {
            worker.join().expect("stress worker panicked");
        }

        let result = StressResult::new(
            successes.load(Ordering::Relaxed),
            failures.load(Ordering::Relaxed),
            start.elapsed(),
            thread_count,
        );
        tracing::debug!(
            "Stress run finished: {} ok, {} failed in {:?}",
            result.successes,
            result.failures,
            result.duration
        );
        result
    }
}
