//! Mutex and condition variable pair used by every blocking primitive.
//!
//! - **With std**: thin wrappers over `std::sync::{Mutex, Condvar}`.
//! - **`no_std`**: spin-waiting with exponential backoff.
//!
//! Both expose the same surface: [`CondVarMutex::lock`] returns a guard
//! directly, [`CondVarMutex::try_lock`] returns `None` when contended, and
//! [`CondVar::wait_until`] waits against a [`Deadline`](crate::time::Deadline)
//! computed once by the caller.
//!
//! ```
//! use foundation_osal::primitives::{CondVar, CondVarMutex};
//!
//! let ready = CondVarMutex::new(true);
//! let signal = CondVar::new();
//!
//! let mut guard = ready.lock();
//! while !*guard {
//!     guard = signal.wait(guard);
//! }
//! ```

/// Whether a timed wait returned because its deadline passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeoutResult(bool);

impl WaitTimeoutResult {
    #[inline]
    #[must_use]
    pub const fn timed_out(&self) -> bool {
        self.0
    }

    #[inline]
    pub(crate) const fn new(timed_out: bool) -> Self {
        Self(timed_out)
    }
}

#[cfg(feature = "std")]
mod std_impl;
#[cfg(feature = "std")]
pub use std_impl::{CondVar, CondVarMutex, CondVarMutexGuard};

// The spin implementation is also built for host tests so it runs under real threads.
#[cfg(any(not(feature = "std"), test))]
#[cfg_attr(feature = "std", allow(dead_code))]
mod nostd_impl;
#[cfg(not(feature = "std"))]
pub use nostd_impl::{CondVar, CondVarMutex, CondVarMutexGuard};
