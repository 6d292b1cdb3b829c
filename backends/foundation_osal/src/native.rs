//! Forwarding adapters for RTOS ports that already provide queues and
//! mutexes.
//!
//! A port implements [`RtosPort`] over its kernel's queue calls (`create`,
//! `send`, `send from ISR`, `receive`, ...) and mutex calls (`create`,
//! `take`, `give`, `delete`). [`NativeQueue`] then exposes the queue through
//! the same [`QueueBackend`] contract as [`SyncQueue`](crate::queue::SyncQueue),
//! converting millisecond timeouts into kernel ticks and forwarding the
//! kernel's "higher priority task woken" flag as
//! [`IsrSend::reschedule_requested`]. [`NativeMutex`] does the same for
//! [`OsMutex`](crate::mutex::OsMutex)'s `take`/`give` surface.
//!
//! The kernel owns blocking, wakeups and fairness; nothing here waits.

use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::errors::{OsalError, OsalResult};
use crate::mutex::MutexKind;
use crate::queue::{IsrSend, QueueBackend};
use crate::time::{NO_WAIT, WAIT_FOREVER};

/// Kernel time unit.
pub type Ticks = u32;

/// Tick count meaning "block indefinitely".
pub const MAX_DELAY: Ticks = Ticks::MAX;

/// What the kernel reported for an interrupt-context send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsrStatus {
    pub sent: bool,
    pub higher_priority_woken: bool,
}

/// Kernel queue and mutex calls of one RTOS.
pub trait RtosPort: Send + Sync {
    type QueueHandle: Send + Sync;
    type MutexHandle: Send + Sync;

    /// Kernel tick frequency.
    const TICK_RATE_HZ: u32;

    /// `None` when the kernel could not allocate the queue.
    fn queue_create(&self, length: usize, item_size: usize) -> Option<Self::QueueHandle>;

    /// `false` when no slot freed up within `ticks`.
    fn queue_send(&self, queue: &Self::QueueHandle, item: &[u8], ticks: Ticks) -> bool;

    fn queue_send_from_isr(&self, queue: &Self::QueueHandle, item: &[u8]) -> IsrStatus;

    /// `false` when no item arrived within `ticks`.
    fn queue_receive(&self, queue: &Self::QueueHandle, out: &mut [u8], ticks: Ticks) -> bool;

    fn queue_messages_waiting(&self, queue: &Self::QueueHandle) -> usize;

    fn queue_spaces_available(&self, queue: &Self::QueueHandle) -> usize;

    fn queue_reset(&self, queue: &Self::QueueHandle);

    fn queue_delete(&self, queue: &Self::QueueHandle);

    /// `None` when the kernel could not allocate the mutex.
    fn mutex_create(&self, recursive: bool) -> Option<Self::MutexHandle>;

    /// `false` when the mutex did not become free within `ticks`.
    fn mutex_take(&self, mutex: &Self::MutexHandle, ticks: Ticks) -> bool;

    /// `false` when the caller does not hold the mutex.
    fn mutex_give(&self, mutex: &Self::MutexHandle) -> bool;

    fn mutex_delete(&self, mutex: &Self::MutexHandle);

    /// Looks up a queue the kernel knows by name.
    ///
    /// # Errors
    ///
    /// [`OsalError::Unsupported`] unless the kernel has named objects.
    fn queue_open(&self, _name: &str) -> OsalResult<Self::QueueHandle> {
        Err(OsalError::Unsupported)
    }

    /// Rounds up, so a non-zero wait never collapses into a poll.
    #[must_use]
    fn ms_to_ticks(ms: u32) -> Ticks {
        match ms {
            NO_WAIT => 0,
            WAIT_FOREVER => MAX_DELAY,
            ms => {
                let ticks = (u64::from(ms) * u64::from(Self::TICK_RATE_HZ)).div_ceil(1000);
                Ticks::try_from(ticks).map_or(MAX_DELAY - 1, |t| t.clamp(1, MAX_DELAY - 1))
            }
        }
    }
}

pub struct NativeQueue<P: RtosPort> {
    port: P,
    handle: P::QueueHandle,
    name: String,
    item_size: usize,
    destroyed: AtomicBool,
}

impl<P: RtosPort> NativeQueue<P> {
    /// Creates a kernel queue through `port`.
    ///
    /// # Errors
    ///
    /// [`OsalError::InvalidArgument`] for zero sizes,
    /// [`OsalError::AllocationFailed`] when the kernel refuses.
    pub fn create(port: P, capacity: usize, item_size: usize, name: &str) -> OsalResult<Arc<Self>> {
        if capacity == 0 || item_size == 0 {
            return Err(OsalError::InvalidArgument);
        }

        let handle = port
            .queue_create(capacity, item_size)
            .ok_or(OsalError::AllocationFailed)?;

        tracing::debug!("Created native queue {:?}: {} x {} bytes", name, capacity, item_size);
        Ok(Arc::new(Self {
            port,
            handle,
            name: String::from(name),
            item_size,
            destroyed: AtomicBool::new(false),
        }))
    }

    /// Attaches to a queue the kernel already knows by `name`.
    ///
    /// # Errors
    ///
    /// Whatever [`RtosPort::queue_open`] reports; [`OsalError::Unsupported`]
    /// for kernels without named objects.
    pub fn open(port: P, name: &str, item_size: usize) -> OsalResult<Arc<Self>> {
        let handle = port.queue_open(name)?;
        Ok(Arc::new(Self {
            port,
            handle,
            name: String::from(name),
            item_size,
            destroyed: AtomicBool::new(false),
        }))
    }

    fn check(&self, len: usize) -> OsalResult<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(OsalError::Destroyed);
        }
        if len != self.item_size {
            return Err(OsalError::InvalidArgument);
        }
        Ok(())
    }
}

impl<P: RtosPort> QueueBackend for NativeQueue<P> {
    fn send(&self, item: &[u8], timeout_ms: u32) -> OsalResult<()> {
        self.check(item.len())?;
        if self.port.queue_send(&self.handle, item, P::ms_to_ticks(timeout_ms)) {
            return Ok(());
        }

        Err(match timeout_ms {
            _ if self.destroyed.load(Ordering::Acquire) => OsalError::Destroyed,
            NO_WAIT => OsalError::Full,
            _ => OsalError::Timeout,
        })
    }

    fn receive(&self, out: &mut [u8], timeout_ms: u32) -> OsalResult<()> {
        self.check(out.len())?;
        if self
            .port
            .queue_receive(&self.handle, out, P::ms_to_ticks(timeout_ms))
        {
            return Ok(());
        }

        Err(match timeout_ms {
            _ if self.destroyed.load(Ordering::Acquire) => OsalError::Destroyed,
            NO_WAIT => OsalError::Empty,
            _ => OsalError::Timeout,
        })
    }

    fn send_from_isr(&self, item: &[u8]) -> OsalResult<IsrSend> {
        self.check(item.len())?;
        let status = self.port.queue_send_from_isr(&self.handle, item);
        if !status.sent {
            return Err(OsalError::Full);
        }

        Ok(IsrSend {
            reschedule_requested: status.higher_priority_woken,
        })
    }

    fn count(&self) -> usize {
        if self.destroyed.load(Ordering::Acquire) {
            return 0;
        }
        self.port.queue_messages_waiting(&self.handle)
    }

    fn space(&self) -> usize {
        if self.destroyed.load(Ordering::Acquire) {
            return 0;
        }
        self.port.queue_spaces_available(&self.handle)
    }

    fn reset(&self) -> OsalResult<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(OsalError::Destroyed);
        }
        self.port.queue_reset(&self.handle);
        tracing::debug!("Reset native queue {:?}", self.name);
        Ok(())
    }

    /// Deletes the kernel queue once. Tasks blocked on it at that moment are
    /// handled by the kernel's own delete semantics.
    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            tracing::warn!("Native queue {:?} destroyed more than once", self.name);
            return;
        }
        self.port.queue_delete(&self.handle);
        tracing::debug!("Destroyed native queue {:?}", self.name);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<P: RtosPort> core::fmt::Debug for NativeQueue<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NativeQueue")
            .field("name", &self.name)
            .field("item_size", &self.item_size)
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// A kernel mutex behind the `take`/`give` surface of
/// [`OsMutex`](crate::mutex::OsMutex).
///
/// Ownership and recursion are enforced by the kernel. Kernels without
/// self-deadlock detection let a [`MutexKind::Normal`] self-retake run into
/// its timeout, so it surfaces as [`OsalError::WouldBlock`] or
/// [`OsalError::Timeout`] rather than [`OsalError::WouldDeadlock`].
pub struct NativeMutex<P: RtosPort> {
    port: P,
    handle: P::MutexHandle,
    name: String,
    kind: MutexKind,
    destroyed: AtomicBool,
}

impl<P: RtosPort> NativeMutex<P> {
    /// Creates a kernel mutex through `port`.
    ///
    /// # Errors
    ///
    /// [`OsalError::AllocationFailed`] when the kernel refuses.
    pub fn create(port: P, name: &str, kind: MutexKind) -> OsalResult<Arc<Self>> {
        let Some(handle) = port.mutex_create(kind == MutexKind::Recursive) else {
            tracing::error!("Kernel refused to create {:?} mutex {:?}", kind, name);
            return Err(OsalError::AllocationFailed);
        };

        tracing::debug!("Created native {:?} mutex {:?}", kind, name);
        Ok(Arc::new(Self {
            port,
            handle,
            name: String::from(name),
            kind,
            destroyed: AtomicBool::new(false),
        }))
    }

    /// Blocks until the mutex is free.
    ///
    /// # Errors
    ///
    /// Same as [`NativeMutex::take_timeout`].
    pub fn take(&self) -> OsalResult<()> {
        self.take_timeout(WAIT_FOREVER)
    }

    /// # Errors
    ///
    /// [`OsalError::WouldBlock`] when another task holds the mutex, plus the
    /// errors of [`NativeMutex::take_timeout`].
    pub fn try_take(&self) -> OsalResult<()> {
        self.take_timeout(NO_WAIT)
    }

    /// Waits at most `timeout_ms` for the mutex.
    ///
    /// # Errors
    ///
    /// [`OsalError::Timeout`] when the kernel gives up,
    /// [`OsalError::Destroyed`] after destroy.
    pub fn take_timeout(&self, timeout_ms: u32) -> OsalResult<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(OsalError::Destroyed);
        }
        if self
            .port
            .mutex_take(&self.handle, P::ms_to_ticks(timeout_ms))
        {
            return Ok(());
        }

        Err(match timeout_ms {
            _ if self.destroyed.load(Ordering::Acquire) => OsalError::Destroyed,
            NO_WAIT => OsalError::WouldBlock,
            _ => OsalError::Timeout,
        })
    }

    /// Releases one level of ownership.
    ///
    /// # Errors
    ///
    /// [`OsalError::NotOwner`] when the kernel rejects the give,
    /// [`OsalError::Destroyed`] after destroy.
    pub fn give(&self) -> OsalResult<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(OsalError::Destroyed);
        }
        if self.port.mutex_give(&self.handle) {
            return Ok(());
        }

        tracing::warn!("Kernel rejected give on mutex {:?}", self.name);
        Err(OsalError::NotOwner)
    }

    /// Deletes the kernel mutex once; later calls fail with
    /// [`OsalError::Destroyed`].
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            tracing::warn!("Native mutex {:?} destroyed more than once", self.name);
            return;
        }
        self.port.mutex_delete(&self.handle);
        tracing::debug!("Destroyed native mutex {:?}", self.name);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> MutexKind {
        self.kind
    }
}

impl<P: RtosPort> core::fmt::Debug for NativeMutex<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NativeMutex")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutex::OsMutex;
    use crate::queue::SyncQueue;

    /// Kernel stand-in: one tick per millisecond, queues backed by
    /// [`SyncQueue`], mutexes by [`OsMutex`], and every successful ISR send
    /// wakes a "higher priority" task.
    struct LoopbackPort;

    impl RtosPort for LoopbackPort {
        type QueueHandle = Arc<SyncQueue>;
        type MutexHandle = Arc<OsMutex>;

        const TICK_RATE_HZ: u32 = 1000;

        fn queue_create(&self, length: usize, item_size: usize) -> Option<Self::QueueHandle> {
            SyncQueue::create(length, item_size, "loopback").ok()
        }

        fn queue_send(&self, queue: &Self::QueueHandle, item: &[u8], ticks: Ticks) -> bool {
            queue.send(item, ticks).is_ok()
        }

        fn queue_send_from_isr(&self, queue: &Self::QueueHandle, item: &[u8]) -> IsrStatus {
            let sent = queue.send_from_isr(item).is_ok();
            IsrStatus {
                sent,
                higher_priority_woken: sent,
            }
        }

        fn queue_receive(&self, queue: &Self::QueueHandle, out: &mut [u8], ticks: Ticks) -> bool {
            queue.receive(out, ticks).is_ok()
        }

        fn queue_messages_waiting(&self, queue: &Self::QueueHandle) -> usize {
            queue.count()
        }

        fn queue_spaces_available(&self, queue: &Self::QueueHandle) -> usize {
            queue.space()
        }

        fn queue_reset(&self, queue: &Self::QueueHandle) {
            let _ = queue.reset();
        }

        fn queue_delete(&self, queue: &Self::QueueHandle) {
            queue.destroy();
        }

        fn mutex_create(&self, recursive: bool) -> Option<Self::MutexHandle> {
            let kind = if recursive {
                MutexKind::Recursive
            } else {
                MutexKind::Normal
            };
            OsMutex::create("loopback", kind).ok()
        }

        fn mutex_take(&self, mutex: &Self::MutexHandle, ticks: Ticks) -> bool {
            mutex.take_timeout(ticks).is_ok()
        }

        fn mutex_give(&self, mutex: &Self::MutexHandle) -> bool {
            mutex.give().is_ok()
        }

        fn mutex_delete(&self, mutex: &Self::MutexHandle) {
            mutex.destroy();
        }
    }

    struct SlowTickPort;

    impl RtosPort for SlowTickPort {
        type QueueHandle = ();
        type MutexHandle = ();

        const TICK_RATE_HZ: u32 = 100;

        fn queue_create(&self, _: usize, _: usize) -> Option<()> {
            None
        }
        fn queue_send(&self, _: &(), _: &[u8], _: Ticks) -> bool {
            false
        }
        fn queue_send_from_isr(&self, _: &(), _: &[u8]) -> IsrStatus {
            IsrStatus::default()
        }
        fn queue_receive(&self, _: &(), _: &mut [u8], _: Ticks) -> bool {
            false
        }
        fn queue_messages_waiting(&self, _: &()) -> usize {
            0
        }
        fn queue_spaces_available(&self, _: &()) -> usize {
            0
        }
        fn queue_reset(&self, _: &()) {}
        fn queue_delete(&self, _: &()) {}
        fn mutex_create(&self, _: bool) -> Option<()> {
            None
        }
        fn mutex_take(&self, _: &(), _: Ticks) -> bool {
            false
        }
        fn mutex_give(&self, _: &()) -> bool {
            false
        }
        fn mutex_delete(&self, _: &()) {}
    }

    #[test]
    fn millis_round_up_to_whole_ticks() {
        assert_eq!(SlowTickPort::ms_to_ticks(NO_WAIT), 0);
        assert_eq!(SlowTickPort::ms_to_ticks(WAIT_FOREVER), MAX_DELAY);
        assert_eq!(SlowTickPort::ms_to_ticks(1), 1);
        assert_eq!(SlowTickPort::ms_to_ticks(10), 1);
        assert_eq!(SlowTickPort::ms_to_ticks(11), 2);
        assert_eq!(LoopbackPort::ms_to_ticks(250), 250);
    }

    #[test]
    fn kernel_refusal_is_an_allocation_failure() {
        assert_eq!(
            NativeQueue::create(SlowTickPort, 4, 4, "refused").unwrap_err(),
            OsalError::AllocationFailed
        );
        assert_eq!(
            NativeQueue::create(SlowTickPort, 0, 4, "empty").unwrap_err(),
            OsalError::InvalidArgument
        );
    }

    #[test]
    fn named_open_is_unsupported_by_default() {
        assert_eq!(
            NativeQueue::open(LoopbackPort, "anything", 4).unwrap_err(),
            OsalError::Unsupported
        );
    }

    #[test]
    fn forwards_send_and_receive() {
        let queue = NativeQueue::create(LoopbackPort, 2, 4, "native").unwrap();
        queue.send(&1u32.to_le_bytes(), NO_WAIT).unwrap();
        queue.send(&2u32.to_le_bytes(), NO_WAIT).unwrap();
        assert!(queue.is_full());
        assert_eq!(queue.send(&3u32.to_le_bytes(), NO_WAIT), Err(OsalError::Full));
        assert_eq!(queue.send(&3u32.to_le_bytes(), 5), Err(OsalError::Timeout));

        let mut out = [0u8; 4];
        queue.receive(&mut out, WAIT_FOREVER).unwrap();
        assert_eq!(u32::from_le_bytes(out), 1);
        assert_eq!(queue.count(), 1);
        assert_eq!(queue.space(), 1);

        queue.reset().unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.receive(&mut out, NO_WAIT), Err(OsalError::Empty));
    }

    #[test]
    fn isr_send_forwards_reschedule_hint() {
        let queue = NativeQueue::create(LoopbackPort, 1, 1, "isr").unwrap();
        let sent = queue.send_from_isr(&[1]).unwrap();
        assert!(sent.reschedule_requested);
        assert_eq!(queue.send_from_isr(&[2]), Err(OsalError::Full));
    }

    #[test]
    fn destroy_deletes_once_and_fails_later_calls() {
        let queue = NativeQueue::create(LoopbackPort, 1, 1, "gone").unwrap();
        queue.destroy();
        queue.destroy();

        let mut out = [0u8; 1];
        assert_eq!(queue.send(&[1], NO_WAIT), Err(OsalError::Destroyed));
        assert_eq!(queue.receive(&mut out, NO_WAIT), Err(OsalError::Destroyed));
        assert_eq!(queue.send_from_isr(&[1]), Err(OsalError::Destroyed));
        assert_eq!(queue.reset(), Err(OsalError::Destroyed));
        assert_eq!(queue.count(), 0);
    }

    #[test]
    fn kernel_mutex_refusal_is_an_allocation_failure() {
        assert_eq!(
            NativeMutex::create(SlowTickPort, "refused", MutexKind::Normal).unwrap_err(),
            OsalError::AllocationFailed
        );
    }

    #[test]
    fn mutex_forwards_recursive_take_and_give() {
        let mutex = NativeMutex::create(LoopbackPort, "nested", MutexKind::Recursive).unwrap();
        assert_eq!(mutex.kind(), MutexKind::Recursive);
        assert_eq!(mutex.name(), "nested");

        mutex.take().unwrap();
        mutex.try_take().unwrap();
        mutex.give().unwrap();
        mutex.give().unwrap();
        assert_eq!(mutex.give(), Err(OsalError::NotOwner));
    }

    #[test]
    fn mutex_kernel_failures_map_by_timeout() {
        let mutex = NativeMutex::create(LoopbackPort, "busy", MutexKind::Normal).unwrap();
        mutex.take().unwrap();

        // The loopback kernel rejects a normal self-retake at once.
        assert_eq!(mutex.try_take(), Err(OsalError::WouldBlock));
        assert_eq!(mutex.take_timeout(5), Err(OsalError::Timeout));

        mutex.give().unwrap();
        mutex.try_take().unwrap();
        mutex.give().unwrap();
    }

    #[cfg(feature = "std")]
    #[test]
    fn mutex_held_elsewhere_times_out_and_refuses_foreign_give() {
        use std::sync::mpsc;

        let mutex = NativeMutex::create(LoopbackPort, "shared", MutexKind::Normal).unwrap();
        let (taken_tx, taken_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let mutex = Arc::clone(&mutex);
            std::thread::spawn(move || {
                mutex.take().unwrap();
                taken_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                mutex.give().unwrap();
            })
        };

        taken_rx.recv().unwrap();
        assert_eq!(mutex.try_take(), Err(OsalError::WouldBlock));
        assert_eq!(mutex.take_timeout(10), Err(OsalError::Timeout));
        assert_eq!(mutex.give(), Err(OsalError::NotOwner));

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        mutex.take_timeout(1000).unwrap();
        mutex.give().unwrap();
    }

    #[test]
    fn mutex_destroy_deletes_once_and_fails_later_calls() {
        let mutex = NativeMutex::create(LoopbackPort, "gone", MutexKind::Normal).unwrap();
        mutex.destroy();
        mutex.destroy();

        assert_eq!(mutex.take(), Err(OsalError::Destroyed));
        assert_eq!(mutex.try_take(), Err(OsalError::Destroyed));
        assert_eq!(mutex.give(), Err(OsalError::Destroyed));
    }
}
