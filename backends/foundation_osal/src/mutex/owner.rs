//! Identity of the execution context holding a mutex.

/// Opaque identifier of a thread (or, without an OS, of the single main loop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

#[cfg(feature = "std")]
mod ids {
    use super::OwnerId;
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_ID: AtomicU64 = AtomicU64::new(1);

    thread_local! {
        static CURRENT: OwnerId = OwnerId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    }

    pub(super) fn current() -> OwnerId {
        CURRENT.with(|id| *id)
    }
}

#[cfg(not(feature = "std"))]
mod ids {
    use super::OwnerId;

    pub(super) fn current() -> OwnerId {
        OwnerId(0)
    }
}

/// The caller's identity. Stable for the lifetime of the calling thread.
#[must_use]
pub fn current() -> OwnerId {
    ids::current()
}
