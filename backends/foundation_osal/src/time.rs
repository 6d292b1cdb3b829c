//! Millisecond timeouts and once-computed deadlines.
//!
//! Every blocking operation takes its timeout as whole milliseconds:
//!
//! - [`NO_WAIT`] (`0`): try once and return immediately.
//! - [`WAIT_FOREVER`] (`u32::MAX`): wait without a deadline.
//! - anything else: wait at most that long, measured from call entry.
//!
//! A finite timeout is turned into a [`Deadline`] exactly once when the call
//! starts. Waiters that wake early (spuriously or because another waiter was
//! served first) wait again only for the time that is left, so repeated
//! wakeups can never stretch a 100ms wait.
//!
//! With the `std` feature deadlines use `std::time::Instant`. Without it they
//! read the millisecond clock hook of the installed
//! [`RuntimeConfig`](crate::config::RuntimeConfig); if no clock was installed
//! a finite timeout degrades to a single attempt.

use core::time::Duration;

/// Do not wait at all.
pub const NO_WAIT: u32 = 0;

/// Wait until the condition is met or the object is destroyed.
pub const WAIT_FOREVER: u32 = u32::MAX;

/// Decoded form of a millisecond timeout argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Poll,
    Forever,
    Millis(u32),
}

impl Timeout {
    #[must_use]
    pub const fn from_millis(ms: u32) -> Self {
        match ms {
            NO_WAIT => Self::Poll,
            WAIT_FOREVER => Self::Forever,
            other => Self::Millis(other),
        }
    }

    /// Snapshots the deadline for a finite timeout.
    ///
    /// Must be called once at operation entry, never inside a wait loop.
    #[must_use]
    pub fn deadline(self) -> Option<Deadline> {
        match self {
            Self::Millis(ms) => Some(Deadline::after_millis(ms)),
            Self::Poll | Self::Forever => None,
        }
    }
}

impl From<u32> for Timeout {
    fn from(ms: u32) -> Self {
        Self::from_millis(ms)
    }
}

/// An absolute point in time bounding a wait.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: std::time::Instant,
}

#[cfg(feature = "std")]
impl Deadline {
    #[must_use]
    pub fn after_millis(ms: u32) -> Self {
        Self::after(Duration::from_millis(u64::from(ms)))
    }

    #[must_use]
    pub fn after(dur: Duration) -> Self {
        let now = std::time::Instant::now();
        // Only reachable with absurd durations; clamp to a far but valid point.
        let at = now
            .checked_add(dur)
            .unwrap_or_else(|| now + Duration::from_secs(u64::from(u32::MAX)));
        Self { at }
    }

    #[must_use]
    pub fn has_elapsed(&self) -> bool {
        std::time::Instant::now() >= self.at
    }

    /// Time left until the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(std::time::Instant::now())
    }
}

/// An absolute point in time bounding a wait.
///
/// Expressed in milliseconds of the installed clock hook. `None` means no
/// clock is available and the deadline counts as already elapsed.
#[cfg(not(feature = "std"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at_ms: Option<u64>,
}

#[cfg(not(feature = "std"))]
impl Deadline {
    #[must_use]
    pub fn after_millis(ms: u32) -> Self {
        let at_ms = crate::config::now_ms().map(|now| now.saturating_add(u64::from(ms)));
        if at_ms.is_none() {
            tracing::error!("no clock hook installed, timed waits expire after one attempt");
        }
        Self { at_ms }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn after(dur: Duration) -> Self {
        let ms = dur.as_millis().min(u128::from(u32::MAX - 1)) as u32;
        Self::after_millis(ms)
    }

    #[must_use]
    pub fn has_elapsed(&self) -> bool {
        match (self.at_ms, crate::config::now_ms()) {
            (Some(at), Some(now)) => now >= at,
            _ => true,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        match (self.at_ms, crate::config::now_ms()) {
            (Some(at), Some(now)) => Duration::from_millis(at.saturating_sub(now)),
            _ => Duration::ZERO,
        }
    }
}
