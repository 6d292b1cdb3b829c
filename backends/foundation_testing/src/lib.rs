//! Stress testing infrastructure for `foundation_osal` primitives.
//!
//! This crate provides:
//! - **Stress test framework**: configurable high-contention runs over
//!   [`SyncQueue`](foundation_osal::SyncQueue) and
//!   [`OsMutex`](foundation_osal::OsMutex)
//! - **Scenarios**: a typed producer-consumer queue and a multi-threaded
//!   pipeline built from OSAL threads
//! - **Performance metrics**: latency percentiles and throughput
//! - **Criterion benchmarks**: see `benches/queue_bench.rs`
//!
//! # Examples
//!
//! ```rust
//! use foundation_testing::stress::{StressConfig, StressHarness};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let config = StressConfig::new()
//!     .threads(4)
//!     .iterations(250);
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! let harness = StressHarness::new(config);
//!
//! let counter_clone = Arc::clone(&counter);
//! let results = harness.run(move |_thread_id, _iteration| {
//!     counter_clone.fetch_add(1, Ordering::Relaxed);
//!     true
//! });
//!
//! assert_eq!(results.successes, 1000);
//! assert!(results.success_rate() > 0.99);
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod metrics;
pub mod scenarios;
pub mod stress;

pub use metrics::{Metrics, PerformanceReport};
pub use scenarios::{ProducerConsumerQueue, ScenarioError};
pub use stress::{StressConfig, StressHarness, StressResult};
