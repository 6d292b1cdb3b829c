//! Threads of control.
//!
//! The backend is picked at build time:
//!
//! - `std`: [`Thread`] wraps `std::thread`. Priorities are recorded and
//!   reported, not applied. Suspension is cooperative: a suspended thread
//!   parks at its next [`sleep_ms`], [`yield_now`] or [`checkpoint`].
//! - without `std`: there is a single thread of control. [`sleep_ms`]
//!   forwards to the sleep hook of the installed
//!   [`RuntimeConfig`](crate::config::RuntimeConfig), which must be installed
//!   before the first call. [`current`] reports
//!   [`OsalError::Unsupported`](crate::OsalError::Unsupported).

#[cfg(any(not(feature = "std"), test))]
#[cfg_attr(feature = "std", allow(dead_code))]
mod bare;
#[cfg(feature = "std")]
mod hosted;

#[cfg(not(feature = "std"))]
pub use bare::{checkpoint, current, sleep_ms, sleep_ms_with, yield_now, Thread, ThreadHandle};
#[cfg(feature = "std")]
pub use hosted::{checkpoint, current, sleep_ms, yield_now, Thread, ThreadHandle};

use alloc::string::String;

/// Scheduling priority. Higher values run first on backends that honour it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    pub const IDLE: Self = Self(0);
    pub const LOW: Self = Self(3);
    pub const NORMAL: Self = Self(5);
    pub const HIGH: Self = Self(7);

    #[must_use]
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    #[must_use]
    pub const fn level(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Creation attributes. Unset fields fall back to the installed
/// [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadAttributes {
    name: Option<String>,
    priority: Option<Priority>,
    stack_size: Option<usize>,
}

impl ThreadAttributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(String::from(name));
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    #[must_use]
    pub fn stack_size(&self) -> Option<usize> {
        self.stack_size
    }
}
