//! Concurrency scenarios assembled from OSAL primitives.
//!
//! - [`ProducerConsumerQueue`]: a typed `u64` view over `SyncQueue`
//! - [`run_pipeline`]: producers and consumers on OSAL threads draining one
//!   queue, with every item accounted for

pub mod producer_consumer;

pub use producer_consumer::{
    run_pipeline, PipelineConfig, PipelineReport, ProducerConsumerQueue, ScenarioError,
};
