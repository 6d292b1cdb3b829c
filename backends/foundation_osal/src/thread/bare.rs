//! Single-threaded backend for targets without an operating system.
//!
//! There is exactly one thread of control, so thread creation is refused and
//! no [`Thread`] value can exist. Sleeping is delegated to the platform
//! through the installed [`RuntimeConfig`].

use super::{Priority, ThreadAttributes};
use crate::config::{self, RuntimeConfig};
use crate::errors::{OsalError, OsalResult};

/// Uninhabited: creation always fails on this backend.
#[derive(Debug)]
pub enum Thread {}

impl Thread {
    /// # Errors
    ///
    /// Always [`OsalError::Unsupported`].
    pub fn create<P>(_entry: fn(P), _parameter: P, attributes: ThreadAttributes) -> OsalResult<Self> {
        tracing::error!(
            "Thread {:?} requested on a backend without threads",
            attributes.name()
        );
        Err(OsalError::Unsupported)
    }

    /// # Errors
    ///
    /// Always [`OsalError::Unsupported`].
    pub fn spawn<F: FnOnce()>(attributes: ThreadAttributes, _f: F) -> OsalResult<Self> {
        tracing::error!(
            "Thread {:?} requested on a backend without threads",
            attributes.name()
        );
        Err(OsalError::Unsupported)
    }

    /// # Errors
    ///
    /// Unreachable, no thread exists to join.
    pub fn join(self) -> OsalResult<()> {
        match self {}
    }

    pub fn suspend(&self) {
        match *self {}
    }

    pub fn resume(&self) {
        match *self {}
    }

    pub fn destroy(self) {
        match self {}
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match *self {}
    }

    #[must_use]
    pub fn priority(&self) -> Priority {
        match *self {}
    }
}

/// Uninhabited: there is no thread object to hand out on this backend.
#[derive(Debug)]
pub enum ThreadHandle {}

impl ThreadHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        match *self {}
    }
}

/// The calling thread.
///
/// # Errors
///
/// Always [`OsalError::Unsupported`]; the single thread of control has no
/// handle.
pub fn current() -> OsalResult<ThreadHandle> {
    tracing::error!("Current thread requested on a backend without threads");
    Err(OsalError::Unsupported)
}

/// Sleeps through the installed configuration's hook.
///
/// Precondition: [`config::install`] was called with a sleep hook. Otherwise
/// this logs an error and returns [`OsalError::NotConfigured`] at once.
///
/// # Errors
///
/// [`OsalError::NotConfigured`] without a sleep hook.
pub fn sleep_ms(ms: u32) -> OsalResult<()> {
    sleep_ms_with(&config::current(), ms)
}

/// Sleeps through an explicitly supplied configuration.
///
/// # Errors
///
/// [`OsalError::NotConfigured`] when `config` has no sleep hook.
pub fn sleep_ms_with(config: &RuntimeConfig, ms: u32) -> OsalResult<()> {
    config.sleep_ms(ms)
}

/// Nothing to yield to; issues a spin hint.
pub fn yield_now() {
    core::hint::spin_loop();
}

/// Nothing can suspend the only thread of control.
pub fn checkpoint() {}
