use alloc::string::String;
use alloc::sync::Arc;

use super::{IsrSend, QueueBackend, QueueLifecycle};
use crate::errors::{OsalError, OsalResult};
use crate::primitives::{CondVar, CondVarMutex, CondVarMutexGuard};
use crate::registry::Registry;
use crate::ring::RingBuffer;
use crate::time::{Deadline, Timeout};

struct QueueState {
    ring: RingBuffer<'static>,
    lifecycle: QueueLifecycle,
}

type StateGuard<'a> = CondVarMutexGuard<'a, QueueState>;

/// A bounded blocking queue of fixed-size items built from a ring buffer, a
/// mutex and two condition variables.
///
/// Every read or write of the ring happens under the mutex. Senders wait on
/// `not_full`, receivers on `not_empty`; each successful operation signals
/// the opposite side. Waiters re-check teardown and their condition on every
/// wakeup, and timed waits share one deadline taken at entry.
///
/// [`SyncQueue::destroy`] marks the queue, wakes every waiter on both
/// conditions and frees the ring storage, all under the lock. Waiters hold an
/// [`Arc`] to the queue, so the mutex and condition variables they wake on
/// outlive the teardown; they observe it on their next check and fail with
/// [`OsalError::Destroyed`].
///
/// No FIFO fairness is promised among waiters; items leave in the order they
/// went in.
pub struct SyncQueue {
    name: String,
    capacity: usize,
    item_size: usize,
    state: CondVarMutex<QueueState>,
    not_full: CondVar,
    not_empty: CondVar,
}

impl SyncQueue {
    /// Creates a queue of `capacity` slots of `item_size` bytes each.
    ///
    /// # Errors
    ///
    /// [`OsalError::InvalidArgument`] for a zero capacity or item size,
    /// [`OsalError::AllocationFailed`] when the ring storage cannot be
    /// allocated. Nothing is leaked on failure.
    pub fn create(capacity: usize, item_size: usize, name: &str) -> OsalResult<Arc<Self>> {
        if capacity == 0 || item_size == 0 {
            tracing::debug!(
                "Refusing queue {:?} with capacity {} and item size {}",
                name,
                capacity,
                item_size
            );
            return Err(OsalError::InvalidArgument);
        }

        let ring = RingBuffer::init_owned(capacity, item_size)?;
        let queue = Arc::new(Self {
            name: String::from(name),
            capacity,
            item_size,
            state: CondVarMutex::new(QueueState {
                ring,
                lifecycle: QueueLifecycle::Active,
            }),
            not_full: CondVar::new(),
            not_empty: CondVar::new(),
        });

        tracing::debug!(
            "Created queue {:?}: {} slots of {} bytes",
            name,
            capacity,
            item_size
        );
        Ok(queue)
    }

    /// Creates a queue and publishes it in `registry` under `name`.
    ///
    /// # Errors
    ///
    /// As [`SyncQueue::create`], plus [`OsalError::AlreadyExists`] if the name
    /// is taken. The new queue is destroyed again in that case.
    pub fn create_named(
        registry: &Registry<SyncQueue>,
        capacity: usize,
        item_size: usize,
        name: &str,
    ) -> OsalResult<Arc<Self>> {
        let queue = Self::create(capacity, item_size, name)?;
        if let Err(err) = registry.register(name, Arc::clone(&queue)) {
            queue.destroy();
            return Err(err);
        }
        Ok(queue)
    }

    /// Looks up a queue previously published with [`SyncQueue::create_named`].
    ///
    /// # Errors
    ///
    /// [`OsalError::NotFound`] if nothing is registered under `name`.
    pub fn open(registry: &Registry<SyncQueue>, name: &str) -> OsalResult<Arc<Self>> {
        registry.open(name)
    }

    fn check_item(&self, len: usize) -> OsalResult<()> {
        if len != self.item_size {
            return Err(OsalError::InvalidArgument);
        }
        Ok(())
    }

    /// Blocks on `signal` until `ready` holds, the queue is torn down or the
    /// timeout runs out.
    ///
    /// Teardown is checked first and the condition before the deadline, so a
    /// wakeup that races the deadline still takes the slot it was woken for.
    fn wait_for<'a>(
        mut state: StateGuard<'a>,
        signal: &CondVar,
        timeout: Timeout,
        deadline: Option<&Deadline>,
        ready: fn(&RingBuffer<'static>) -> bool,
        unavailable: OsalError,
    ) -> OsalResult<StateGuard<'a>> {
        loop {
            if state.lifecycle != QueueLifecycle::Active {
                return Err(OsalError::Destroyed);
            }

            if ready(&state.ring) {
                return Ok(state);
            }

            state = match (timeout, deadline) {
                (Timeout::Poll, _) => return Err(unavailable),
                (_, Some(deadline)) => {
                    if deadline.has_elapsed() {
                        return Err(OsalError::Timeout);
                    }
                    signal.wait_until(state, deadline).0
                }
                (_, None) => signal.wait(state),
            };
        }
    }

    /// Copies `item` into the queue, waiting up to `timeout_ms` for space.
    ///
    /// # Errors
    ///
    /// See [`QueueBackend::send`].
    pub fn send(&self, item: &[u8], timeout_ms: u32) -> OsalResult<()> {
        self.check_item(item.len())?;
        let timeout = Timeout::from_millis(timeout_ms);
        let deadline = timeout.deadline();

        let mut state = Self::wait_for(
            self.state.lock(),
            &self.not_full,
            timeout,
            deadline.as_ref(),
            |ring| !ring.is_full(),
            OsalError::Full,
        )?;

        state.ring.push(item)?;
        self.not_empty.notify_one();
        Ok(())
    }

    /// Moves the oldest item into `out`, waiting up to `timeout_ms` for one.
    ///
    /// # Errors
    ///
    /// See [`QueueBackend::receive`].
    pub fn receive(&self, out: &mut [u8], timeout_ms: u32) -> OsalResult<()> {
        self.check_item(out.len())?;
        let timeout = Timeout::from_millis(timeout_ms);
        let deadline = timeout.deadline();

        let mut state = Self::wait_for(
            self.state.lock(),
            &self.not_empty,
            timeout,
            deadline.as_ref(),
            |ring| !ring.is_empty(),
            OsalError::Empty,
        )?;

        state.ring.pop(out)?;
        self.not_full.notify_one();
        Ok(())
    }

    /// Copies the oldest item into `out` without removing it. Never waits.
    ///
    /// # Errors
    ///
    /// `Empty`, `Destroyed` or `InvalidArgument`.
    pub fn peek(&self, out: &mut [u8]) -> OsalResult<()> {
        self.check_item(out.len())?;

        let state = self.state.lock();
        if state.lifecycle != QueueLifecycle::Active {
            return Err(OsalError::Destroyed);
        }
        state.ring.peek(out)
    }

    /// Sends from interrupt context: one lock attempt, one push attempt.
    ///
    /// The reschedule hint is always `false` here; there is no scheduler to
    /// hand a woken higher-priority waiter to.
    ///
    /// # Errors
    ///
    /// See [`QueueBackend::send_from_isr`].
    pub fn send_from_isr(&self, item: &[u8]) -> OsalResult<IsrSend> {
        self.check_item(item.len())?;

        let mut state = self.state.try_lock().ok_or(OsalError::WouldBlock)?;
        if state.lifecycle != QueueLifecycle::Active {
            return Err(OsalError::Destroyed);
        }

        state.ring.push(item)?;
        self.not_empty.notify_one();
        Ok(IsrSend::default())
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.state.lock().ring.len()
    }

    #[must_use]
    pub fn space(&self) -> usize {
        self.state.lock().ring.free_slots()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// `false` once destroyed: a torn-down queue holds nothing.
    #[must_use]
    pub fn is_full(&self) -> bool {
        let state = self.state.lock();
        state.lifecycle == QueueLifecycle::Active && state.ring.is_full()
    }

    /// Drops every stored item and wakes all waiters on both conditions.
    ///
    /// Waiting senders find space and proceed; waiting receivers go back to
    /// waiting. Nobody is failed.
    ///
    /// # Errors
    ///
    /// [`OsalError::Destroyed`] once the queue was torn down.
    pub fn reset(&self) -> OsalResult<()> {
        let mut state = self.state.lock();
        if state.lifecycle != QueueLifecycle::Active {
            return Err(OsalError::Destroyed);
        }

        let dropped = state.ring.len();
        state.ring.clear();
        self.not_full.notify_all();
        self.not_empty.notify_all();

        tracing::debug!("Reset queue {:?}, dropped {} items", self.name, dropped);
        Ok(())
    }

    /// Tears the queue down.
    ///
    /// Under the lock: marks it destroying, wakes every waiter on both
    /// conditions, frees the ring storage, marks it destroyed. Every blocked
    /// and later caller fails with [`OsalError::Destroyed`]. Calling it again
    /// only logs a warning.
    pub fn destroy(&self) {
        let mut state = self.state.lock();
        if state.lifecycle != QueueLifecycle::Active {
            tracing::warn!("Queue {:?} destroyed more than once", self.name);
            return;
        }

        state.lifecycle = QueueLifecycle::Destroying;
        self.not_full.notify_all();
        self.not_empty.notify_all();

        let storage = state.ring.destroy(true);
        debug_assert!(storage.is_none());
        state.lifecycle = QueueLifecycle::Destroyed;

        tracing::debug!("Destroyed queue {:?}", self.name);
    }

    #[must_use]
    pub fn lifecycle(&self) -> QueueLifecycle {
        self.state.lock().lifecycle
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slots the queue was created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn item_size(&self) -> usize {
        self.item_size
    }
}

impl core::fmt::Debug for SyncQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncQueue")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("item_size", &self.item_size)
            .finish_non_exhaustive()
    }
}

impl QueueBackend for SyncQueue {
    fn send(&self, item: &[u8], timeout_ms: u32) -> OsalResult<()> {
        SyncQueue::send(self, item, timeout_ms)
    }

    fn receive(&self, out: &mut [u8], timeout_ms: u32) -> OsalResult<()> {
        SyncQueue::receive(self, out, timeout_ms)
    }

    fn send_from_isr(&self, item: &[u8]) -> OsalResult<IsrSend> {
        SyncQueue::send_from_isr(self, item)
    }

    fn count(&self) -> usize {
        SyncQueue::count(self)
    }

    fn space(&self) -> usize {
        SyncQueue::space(self)
    }

    fn is_empty(&self) -> bool {
        SyncQueue::is_empty(self)
    }

    fn is_full(&self) -> bool {
        SyncQueue::is_full(self)
    }

    fn reset(&self) -> OsalResult<()> {
        SyncQueue::reset(self)
    }

    fn destroy(&self) {
        SyncQueue::destroy(self);
    }

    fn name(&self) -> &str {
        SyncQueue::name(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{NO_WAIT, WAIT_FOREVER};

    fn item(value: u32) -> [u8; 4] {
        value.to_le_bytes()
    }

    #[test]
    fn create_rejects_zero_sizes() {
        assert_eq!(
            SyncQueue::create(0, 4, "zero-capacity").unwrap_err(),
            OsalError::InvalidArgument
        );
        assert_eq!(
            SyncQueue::create(4, 0, "zero-item").unwrap_err(),
            OsalError::InvalidArgument
        );
    }

    #[test]
    fn create_reports_allocation_failure() {
        assert_eq!(
            SyncQueue::create(usize::MAX, 8, "huge").unwrap_err(),
            OsalError::AllocationFailed
        );
    }

    #[test]
    fn poll_on_full_and_empty_fails_immediately() {
        let queue = SyncQueue::create(1, 4, "poll").unwrap();
        let mut out = [0u8; 4];

        assert_eq!(queue.receive(&mut out, NO_WAIT), Err(OsalError::Empty));
        queue.send(&item(1), NO_WAIT).unwrap();
        assert_eq!(queue.send(&item(2), NO_WAIT), Err(OsalError::Full));

        queue.receive(&mut out, NO_WAIT).unwrap();
        assert_eq!(u32::from_le_bytes(out), 1);
    }

    #[test]
    fn counters_track_occupancy() {
        let queue = SyncQueue::create(3, 4, "counters").unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.space(), 3);

        queue.send(&item(1), NO_WAIT).unwrap();
        queue.send(&item(2), NO_WAIT).unwrap();
        assert_eq!(queue.count(), 2);
        assert_eq!(queue.space(), 1);
        assert!(!queue.is_full());

        queue.send(&item(3), NO_WAIT).unwrap();
        assert!(queue.is_full());
    }

    #[test]
    fn items_of_wrong_length_are_rejected() {
        let queue = SyncQueue::create(2, 4, "lengths").unwrap();
        assert_eq!(queue.send(&[1, 2], NO_WAIT), Err(OsalError::InvalidArgument));
        assert_eq!(
            queue.send_from_isr(&[1, 2, 3, 4, 5]),
            Err(OsalError::InvalidArgument)
        );

        let mut short = [0u8; 3];
        assert_eq!(
            queue.receive(&mut short, NO_WAIT),
            Err(OsalError::InvalidArgument)
        );
    }

    #[test]
    fn peek_leaves_item_in_place() {
        let queue = SyncQueue::create(2, 4, "peek").unwrap();
        queue.send(&item(42), NO_WAIT).unwrap();

        let mut out = [0u8; 4];
        queue.peek(&mut out).unwrap();
        assert_eq!(u32::from_le_bytes(out), 42);
        assert_eq!(queue.count(), 1);
    }

    #[test]
    fn isr_send_never_waits() {
        let queue = SyncQueue::create(1, 4, "isr").unwrap();

        let sent = queue.send_from_isr(&item(5)).unwrap();
        assert!(!sent.reschedule_requested);
        assert_eq!(queue.send_from_isr(&item(6)), Err(OsalError::Full));

        let held = queue.state.lock();
        assert_eq!(queue.send_from_isr(&item(7)), Err(OsalError::WouldBlock));
        drop(held);

        let mut out = [0u8; 4];
        queue.receive(&mut out, WAIT_FOREVER).unwrap();
        assert_eq!(u32::from_le_bytes(out), 5);
    }

    #[test]
    fn reset_clears_items() {
        let queue = SyncQueue::create(4, 4, "reset").unwrap();
        for value in 0..3 {
            queue.send(&item(value), NO_WAIT).unwrap();
        }

        queue.reset().unwrap();
        assert_eq!(queue.count(), 0);
        assert_eq!(queue.space(), 4);
    }

    #[test]
    fn destroyed_queue_fails_every_operation() {
        let queue = SyncQueue::create(2, 4, "teardown").unwrap();
        queue.send(&item(1), NO_WAIT).unwrap();

        queue.destroy();
        assert_eq!(queue.lifecycle(), QueueLifecycle::Destroyed);

        let mut out = [0u8; 4];
        assert_eq!(queue.send(&item(2), WAIT_FOREVER), Err(OsalError::Destroyed));
        assert_eq!(queue.receive(&mut out, WAIT_FOREVER), Err(OsalError::Destroyed));
        assert_eq!(queue.send_from_isr(&item(3)), Err(OsalError::Destroyed));
        assert_eq!(queue.peek(&mut out), Err(OsalError::Destroyed));
        assert_eq!(queue.reset(), Err(OsalError::Destroyed));

        assert_eq!(queue.count(), 0);
        assert_eq!(queue.space(), 0);
        assert!(!queue.is_full());
        assert_eq!(queue.capacity(), 2);
    }

    #[test]
    fn second_destroy_is_a_no_op() {
        let queue = SyncQueue::create(1, 1, "twice").unwrap();
        queue.destroy();
        queue.destroy();
        assert_eq!(queue.lifecycle(), QueueLifecycle::Destroyed);
    }

    #[test]
    fn usable_through_backend_trait() {
        let queue: Arc<dyn QueueBackend> = SyncQueue::create(2, 2, "dyn").unwrap();
        queue.send(&[1, 2], NO_WAIT).unwrap();
        assert_eq!(queue.count(), 1);
        assert_eq!(queue.name(), "dyn");

        let mut out = [0u8; 2];
        queue.receive(&mut out, NO_WAIT).unwrap();
        assert_eq!(out, [1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn named_queues_are_shared_through_registry() {
        let registry = Registry::new();
        let created = SyncQueue::create_named(&registry, 2, 4, "telemetry").unwrap();
        let opened = SyncQueue::open(&registry, "telemetry").unwrap();

        created.send(&item(5), NO_WAIT).unwrap();
        let mut out = [0u8; 4];
        opened.receive(&mut out, NO_WAIT).unwrap();
        assert_eq!(out, item(5));

        assert_eq!(
            SyncQueue::create_named(&registry, 2, 4, "telemetry").unwrap_err(),
            OsalError::AlreadyExists
        );
        assert_eq!(registry.len(), 1);

        let closed = registry.close("telemetry").unwrap();
        closed.destroy();
        assert_eq!(
            SyncQueue::open(&registry, "telemetry").unwrap_err(),
            OsalError::NotFound
        );
    }
}
