//! Bounded queues of fixed-size byte items.
//!
//! [`QueueBackend`] is the contract every queue implementation satisfies.
//! Two implementations ship with this crate:
//!
//! - [`SyncQueue`]: ring buffer plus mutex and two condition variables, for
//!   targets without a native queue (POSIX-like, desktop, bare metal).
//! - [`NativeQueue`](crate::native::NativeQueue): forwards to a native RTOS
//!   queue through an [`RtosPort`](crate::native::RtosPort).
//!
//! Timeouts are whole milliseconds, see [`crate::time`].

mod sync_queue;

pub use sync_queue::SyncQueue;

use crate::errors::OsalResult;

/// Lifecycle of a queue. Moves forward only, exactly once per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueLifecycle {
    Active,
    Destroying,
    Destroyed,
}

/// Outcome of a successful interrupt-context send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsrSend {
    /// Set when the backend unblocked a higher-priority waiter and asks the
    /// interrupt handler to request a context switch on exit.
    ///
    /// Backend specific: only native RTOS ports ever set it. Portable code
    /// must not depend on it.
    pub reschedule_requested: bool,
}

pub trait QueueBackend: Send + Sync {
    /// Copies `item` in, waiting up to `timeout_ms` for a free slot.
    ///
    /// # Errors
    ///
    /// `Full` on a full queue with `NO_WAIT`, `Timeout` when the deadline
    /// elapses, `Destroyed` once the queue was torn down,
    /// `InvalidArgument` when `item` is not exactly one item long.
    fn send(&self, item: &[u8], timeout_ms: u32) -> OsalResult<()>;

    /// Moves the oldest item into `out`, waiting up to `timeout_ms`.
    ///
    /// # Errors
    ///
    /// `Empty`, `Timeout`, `Destroyed` or `InvalidArgument`, mirroring
    /// [`QueueBackend::send`].
    fn receive(&self, out: &mut [u8], timeout_ms: u32) -> OsalResult<()>;

    /// Sends without ever blocking or waiting, for interrupt handlers.
    ///
    /// # Errors
    ///
    /// `Full`, `Destroyed`, `InvalidArgument`, or `WouldBlock` when the
    /// backend cannot take its lock without waiting.
    fn send_from_isr(&self, item: &[u8]) -> OsalResult<IsrSend>;

    /// Items currently stored. A hint: stale as soon as it returns.
    fn count(&self) -> usize;

    /// Free slots. A hint: stale as soon as it returns.
    fn space(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    fn is_full(&self) -> bool {
        self.space() == 0
    }

    /// Drops every stored item and wakes all waiters.
    ///
    /// # Errors
    ///
    /// `Destroyed` once the queue was torn down.
    fn reset(&self) -> OsalResult<()>;

    /// Tears the queue down, failing every current and future waiter.
    fn destroy(&self);

    fn name(&self) -> &str;
}
