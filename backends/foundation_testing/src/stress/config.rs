//! Stress test configuration.

use core::time::Duration;

/// Configuration for stress tests.
#[derive(Debug, Clone, Copy)]
pub struct StressConfig {
    thread_count: usize,
    iterations: usize,
    duration: Option<Duration>,
    queue_capacity: usize,
    timeout_ms: u32,
}

impl StressConfig {
    /// Creates a configuration with default values.
    ///
    /// Defaults:
    /// - `thread_count`: 4
    /// - `iterations`: 1000
    /// - `duration`: None (no time limit)
    /// - `queue_capacity`: 16
    /// - `timeout_ms`: 1000
    #[must_use]
    pub const fn new() -> Self {
        Self {
            thread_count: 4,
            iterations: 1000,
            duration: None,
            queue_capacity: 16,
            timeout_ms: 1000,
        }
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub const fn threads(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    /// Sets the number of iterations per thread.
    #[must_use]
    pub const fn iterations(mut self, count: usize) -> Self {
        self.iterations = count;
        self
    }

    /// Stops workers early once `duration` has passed.
    #[must_use]
    pub const fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the time limit in seconds.
    #[must_use]
    pub const fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Some(Duration::from_secs(secs));
        self
    }

    /// Slot count of the queues the queue runners create.
    #[must_use]
    pub const fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Millisecond timeout handed to every blocking call.
    #[must_use]
    pub const fn timeout_ms(mut self, ms: u32) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Returns the thread count.
    #[must_use]
    pub const fn get_thread_count(&self) -> usize {
        self.thread_count
    }

    /// Returns the iteration count.
    #[must_use]
    pub const fn get_iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the optional time limit.
    #[must_use]
    pub const fn get_duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Returns the queue slot count.
    #[must_use]
    pub const fn get_queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Returns the per-call timeout in milliseconds.
    #[must_use]
    pub const fn get_timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self::new()
    }
}
