//! Latency and throughput measurements for queue round trips.

pub mod reporter;

pub use reporter::{PerformanceReport, Reporter};

use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use foundation_osal::queue::SyncQueue;
use foundation_osal::thread::{Thread, ThreadAttributes};
use foundation_osal::{OsalResult, WAIT_FOREVER};

/// Latency samples plus the throughput they add up to.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// Latency samples in nanoseconds, in recording order
    pub latencies: Vec<u64>,
    /// Operations per second over `duration`
    pub throughput: f64,
    /// Operations completed
    pub operations: usize,
    /// Wall time the operations took
    pub duration: Duration,
}

impl Metrics {
    /// Creates metrics for `operations` completed in `duration`.
    #[must_use]
    pub const fn new(operations: usize, duration: Duration) -> Self {
        Self {
            latencies: Vec::new(),
            throughput: 0.0,
            operations,
            duration,
        }
    }

    /// Fills in `throughput` from `operations` and `duration`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn with_throughput(mut self) -> Self {
        let secs = self.duration.as_secs_f64();
        self.throughput = if secs > 0.0 {
            self.operations as f64 / secs
        } else {
            0.0
        };
        self
    }

    /// Records latency samples, saturating each at `u64::MAX` nanoseconds.
    #[must_use]
    pub fn with_samples(mut self, samples: &[Duration]) -> Self {
        self.latencies = samples
            .iter()
            .map(|sample| u64::try_from(sample.as_nanos()).unwrap_or(u64::MAX))
            .collect();
        self
    }

    /// Returns the minimum latency in nanoseconds.
    #[must_use]
    pub fn min_latency(&self) -> Option<u64> {
        self.latencies.iter().min().copied()
    }

    /// Returns the maximum latency in nanoseconds.
    #[must_use]
    pub fn max_latency(&self) -> Option<u64> {
        self.latencies.iter().max().copied()
    }

    /// Returns the average latency in nanoseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_latency(&self) -> Option<f64> {
        if self.latencies.is_empty() {
            return None;
        }
        let sum: u128 = self.latencies.iter().map(|&ns| u128::from(ns)).sum();
        Some(sum as f64 / self.latencies.len() as f64)
    }

    /// Returns the median latency in nanoseconds.
    #[must_use]
    pub fn median_latency(&self) -> Option<u64> {
        self.percentile_latency(0.5)
    }

    /// Returns the p95 latency in nanoseconds.
    #[must_use]
    pub fn p95_latency(&self) -> Option<u64> {
        self.percentile_latency(0.95)
    }

    /// Returns the p99 latency in nanoseconds.
    #[must_use]
    pub fn p99_latency(&self) -> Option<u64> {
        self.percentile_latency(0.99)
    }

    /// Returns the nearest-rank latency at `percentile` (0.0 to 1.0).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn percentile_latency(&self, percentile: f64) -> Option<u64> {
        if self.latencies.is_empty() || !(0.0..=1.0).contains(&percentile) {
            return None;
        }

        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();

        let rank = ((sorted.len() as f64) * percentile).ceil() as usize;
        Some(sorted[rank.saturating_sub(1).min(sorted.len() - 1)])
    }
}

/// Measures send-to-receive latency through a fresh queue.
///
/// An echo thread receives every item from one queue and sends it back on a
/// second one; each sample is one full round trip.
///
/// # Errors
///
/// Any queue or thread error from setting up or running the echo loop.
pub fn measure_round_trips(rounds: usize, capacity: usize) -> OsalResult<Metrics> {
    let requests = SyncQueue::create(capacity, 8, "metrics-request")?;
    let replies = SyncQueue::create(capacity, 8, "metrics-reply")?;

    let echo = {
        let requests = Arc::clone(&requests);
        let replies = Arc::clone(&replies);
        Thread::spawn(ThreadAttributes::new().with_name("metrics-echo"), move || {
            let mut item = [0u8; 8];
            while requests.receive(&mut item, WAIT_FOREVER).is_ok() {
                if replies.send(&item, WAIT_FOREVER).is_err() {
                    break;
                }
            }
        })?
    };

    let mut samples = Vec::with_capacity(rounds);
    let mut reply = [0u8; 8];
    let started = Instant::now();
    for round in 0..rounds {
        let sent_at = Instant::now();
        requests.send(&(round as u64).to_le_bytes(), WAIT_FOREVER)?;
        replies.receive(&mut reply, WAIT_FOREVER)?;
        samples.push(sent_at.elapsed());
    }
    let duration = started.elapsed();

    requests.destroy();
    replies.destroy();
    echo.join()?;

    Ok(Metrics::new(rounds, duration)
        .with_throughput()
        .with_samples(&samples))
}
