//! Exponential backoff for spin waiting.
//!
//! ```
//! use foundation_osal::primitives::SpinWait;
//!
//! let mut spin = SpinWait::new();
//! loop {
//!     if try_acquire() {
//!         break;
//!     }
//!     spin.snooze();
//! }
//! # fn try_acquire() -> bool { true }
//! ```

use core::hint;

const SPIN_LIMIT: u32 = 10;

/// Backoff state for one spin-waiting sequence.
///
/// The first ten rounds issue `1, 2, 4, ..` CPU spin hints. Once
/// exhausted, [`SpinWait::snooze`] hands the CPU back to the scheduler when
/// there is one (`std`), or keeps issuing a single spin hint otherwise.
#[derive(Debug, Default)]
pub struct SpinWait {
    counter: u32,
}

impl SpinWait {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Performs one backoff round.
    ///
    /// Returns `false` without spinning once the limit has been reached.
    #[inline]
    pub fn spin(&mut self) -> bool {
        if self.counter >= SPIN_LIMIT {
            return false;
        }

        for _ in 0..(1u32 << self.counter) {
            hint::spin_loop();
        }

        self.counter += 1;
        true
    }

    /// Backs off, yielding the thread once spinning is exhausted.
    #[inline]
    pub fn snooze(&mut self) {
        if self.spin() {
            return;
        }

        #[cfg(feature = "std")]
        std::thread::yield_now();

        #[cfg(not(feature = "std"))]
        hint::spin_loop();
    }

    #[inline]
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    #[inline]
    #[must_use]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.counter >= SPIN_LIMIT
    }
}
