//! Producer-consumer patterns over `SyncQueue`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use derive_more::From;
use foundation_osal::primitives::CondVarMutex;
use foundation_osal::queue::SyncQueue;
use foundation_osal::thread::{Thread, ThreadAttributes};
use foundation_osal::{OsalError, NO_WAIT, WAIT_FOREVER};

/// Failure of a scenario run.
#[derive(From, Debug)]
pub enum ScenarioError {
    /// A primitive call failed.
    Osal(OsalError),

    /// Fewer or more items came out than went in.
    #[from(ignore)]
    ItemsLost {
        /// Items the producers sent
        expected: usize,
        /// Items the consumers got
        received: usize,
    },

    /// The same item was received twice.
    #[from(ignore)]
    Duplicated(u64),
}

impl std::error::Error for ScenarioError {}

impl core::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Result alias for scenario code.
pub type ScenarioResult<T> = Result<T, ScenarioError>;

const ITEM_SIZE: usize = core::mem::size_of::<u64>();

/// A `u64` queue with blocking push/pop, backed by a [`SyncQueue`].
///
/// # Examples
///
/// ```
/// use foundation_testing::scenarios::ProducerConsumerQueue;
/// use std::thread;
///
/// let queue = ProducerConsumerQueue::new(10).unwrap();
///
/// let producer_queue = queue.clone();
/// let producer = thread::spawn(move || {
///     for i in 0..5 {
///         producer_queue.push(i).unwrap();
///     }
/// });
///
/// let consumer_queue = queue.clone();
/// let consumer = thread::spawn(move || {
///     (0..5).map(|_| consumer_queue.pop().unwrap()).collect::<Vec<_>>()
/// });
///
/// producer.join().unwrap();
/// assert_eq!(consumer.join().unwrap(), vec![0, 1, 2, 3, 4]);
/// ```
#[derive(Clone, Debug)]
pub struct ProducerConsumerQueue {
    inner: Arc<SyncQueue>,
}

impl ProducerConsumerQueue {
    /// Creates a queue holding at most `capacity` values.
    ///
    /// # Errors
    ///
    /// [`OsalError::InvalidArgument`] for a zero capacity.
    pub fn new(capacity: usize) -> ScenarioResult<Self> {
        Ok(Self {
            inner: SyncQueue::create(capacity, ITEM_SIZE, "producer-consumer")?,
        })
    }

    /// Pushes `value`, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// [`OsalError::Destroyed`] once the queue was closed.
    pub fn push(&self, value: u64) -> ScenarioResult<()> {
        self.push_timeout(value, WAIT_FOREVER)
    }

    /// Pushes `value` without waiting.
    ///
    /// # Errors
    ///
    /// [`OsalError::Full`] when no slot is free.
    pub fn try_push(&self, value: u64) -> ScenarioResult<()> {
        self.push_timeout(value, NO_WAIT)
    }

    /// Pushes `value`, waiting at most `timeout_ms`.
    ///
    /// # Errors
    ///
    /// Whatever [`SyncQueue::send`] reports.
    pub fn push_timeout(&self, value: u64, timeout_ms: u32) -> ScenarioResult<()> {
        self.inner
            .send(&value.to_le_bytes(), timeout_ms)
            .map_err(ScenarioError::from)
    }

    /// Pops the oldest value, blocking while the queue is empty.
    ///
    /// # Errors
    ///
    /// [`OsalError::Destroyed`] once the queue was closed.
    pub fn pop(&self) -> ScenarioResult<u64> {
        self.pop_timeout(WAIT_FOREVER)
    }

    /// Pops the oldest value, waiting at most `timeout_ms`.
    ///
    /// # Errors
    ///
    /// Whatever [`SyncQueue::receive`] reports.
    pub fn pop_timeout(&self, timeout_ms: u32) -> ScenarioResult<u64> {
        let mut out = [0u8; ITEM_SIZE];
        self.inner.receive(&mut out, timeout_ms)?;
        Ok(u64::from_le_bytes(out))
    }

    /// Returns the number of queued values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.count()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the capacity of the queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Destroys the queue, failing every blocked and future call.
    pub fn close(&self) {
        self.inner.destroy();
    }

    /// The underlying byte queue.
    #[must_use]
    pub fn as_sync_queue(&self) -> &Arc<SyncQueue> {
        &self.inner
    }
}

/// Shape of a [`run_pipeline`] run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    producers: usize,
    consumers: usize,
    items_per_producer: usize,
    capacity: usize,
}

impl PipelineConfig {
    /// Two producers, two consumers, 100 items each, 8 slots.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            producers: 2,
            consumers: 2,
            items_per_producer: 100,
            capacity: 8,
        }
    }

    /// Sets the number of producer threads.
    #[must_use]
    pub const fn producers(mut self, count: usize) -> Self {
        self.producers = count;
        self
    }

    /// Sets the number of consumer threads.
    #[must_use]
    pub const fn consumers(mut self, count: usize) -> Self {
        self.consumers = count;
        self
    }

    /// Sets how many items each producer sends.
    #[must_use]
    pub const fn items_per_producer(mut self, count: usize) -> Self {
        self.items_per_producer = count;
        self
    }

    /// Sets the queue capacity.
    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What a successful pipeline run delivered.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Items received across all consumers
    pub items: usize,
    /// Items each consumer received, by consumer index
    pub per_consumer: Vec<usize>,
    /// Wall time from first spawn to last join
    pub duration: Duration,
}

const STOP: u64 = u64::MAX;

type Slot<T> = Arc<CondVarMutex<T>>;

/// Closes the queue when dropped, so every exit path releases consumers.
struct CloseOnDrop(ProducerConsumerQueue);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

struct ProducerJob {
    queue: ProducerConsumerQueue,
    id: u64,
    items: usize,
    error: Slot<Option<ScenarioError>>,
}

struct ConsumerJob {
    queue: ProducerConsumerQueue,
    received: Slot<Vec<u64>>,
    error: Slot<Option<ScenarioError>>,
}

fn record(slot: &Slot<Option<ScenarioError>>, error: ScenarioError) {
    let mut first = slot.lock();
    if first.is_none() {
        *first = Some(error);
    }
}

fn produce(job: ProducerJob) {
    for index in 0..job.items as u64 {
        if let Err(error) = job.queue.push((job.id << 32) | index) {
            record(&job.error, error);
            return;
        }
    }
}

fn consume(job: ConsumerJob) {
    loop {
        match job.queue.pop() {
            Ok(STOP) => return,
            Ok(value) => job.received.lock().push(value),
            Err(error) => {
                record(&job.error, error);
                return;
            }
        }
    }
}

/// Runs producers and consumers on OSAL threads over one shared queue.
///
/// Producers push `id << 32 | index`. After they finish, one stop marker per
/// consumer is queued. Every produced item must come out exactly once.
///
/// The queue is closed on every return, so consumers already spawned are
/// released with [`OsalError::Destroyed`] when a later step fails.
///
/// # Errors
///
/// [`OsalError::InvalidArgument`] for zero producers or zero consumers,
/// [`ScenarioError::Osal`] if a thread or queue call fails,
/// [`ScenarioError::ItemsLost`] or [`ScenarioError::Duplicated`] if the
/// delivered items do not match what was sent.
pub fn run_pipeline(config: PipelineConfig) -> ScenarioResult<PipelineReport> {
    if config.producers == 0 || config.consumers == 0 {
        tracing::error!(
            "Pipeline needs at least one producer and one consumer, got {} and {}",
            config.producers,
            config.consumers
        );
        return Err(OsalError::InvalidArgument.into());
    }

    let started = Instant::now();
    let queue = ProducerConsumerQueue::new(config.capacity)?;
    let closer = CloseOnDrop(queue.clone());
    let error: Slot<Option<ScenarioError>> = Arc::new(CondVarMutex::new(None));

    let mut consumers = Vec::with_capacity(config.consumers);
    let mut buckets = Vec::with_capacity(config.consumers);
    for index in 0..config.consumers {
        let received: Slot<Vec<u64>> = Arc::new(CondVarMutex::new(Vec::new()));
        let job = ConsumerJob {
            queue: queue.clone(),
            received: Arc::clone(&received),
            error: Arc::clone(&error),
        };
        let attributes = ThreadAttributes::new().with_name(&format!("consumer-{index}"));
        consumers.push(Thread::create(consume, job, attributes)?);
        buckets.push(received);
    }

    let mut producers = Vec::with_capacity(config.producers);
    for id in 0..config.producers {
        let job = ProducerJob {
            queue: queue.clone(),
            id: id as u64,
            items: config.items_per_producer,
            error: Arc::clone(&error),
        };
        let attributes = ThreadAttributes::new().with_name(&format!("producer-{id}"));
        producers.push(Thread::create(produce, job, attributes)?);
    }

    for producer in producers {
        producer.join()?;
    }
    for _ in 0..config.consumers {
        queue.push(STOP)?;
    }
    for consumer in consumers {
        consumer.join()?;
    }
    drop(closer);

    if let Some(error) = error.lock().take() {
        return Err(error);
    }

    let per_consumer: Vec<usize> = buckets.iter().map(|bucket| bucket.lock().len()).collect();
    let mut all: Vec<u64> = buckets
        .iter()
        .flat_map(|bucket| bucket.lock().clone())
        .collect();
    all.sort_unstable();

    let expected = config.producers * config.items_per_producer;
    if all.len() != expected {
        return Err(ScenarioError::ItemsLost {
            expected,
            received: all.len(),
        });
    }
    if let Some(pair) = all.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(ScenarioError::Duplicated(pair[0]));
    }

    let report = PipelineReport {
        items: all.len(),
        per_consumer,
        duration: started.elapsed(),
    };
    tracing::info!(
        "Pipeline moved {} items through {} consumers in {:?}",
        report.items,
        config.consumers,
        report.duration
    );
    Ok(report)
}
