//! Runtime configuration supplied by the platform integration.
//!
//! Targets without an operating system cannot sleep or read a clock on their
//! own, so the integration hands those capabilities over as plain function
//! hooks inside a [`RuntimeConfig`] and installs it once, before the first
//! call that needs it:
//!
//! ```
//! use foundation_osal::config::{self, RuntimeConfig};
//!
//! fn board_sleep(_ms: u32) { /* busy-wait on a hardware timer */ }
//! fn board_millis() -> u64 { 0 }
//!
//! let config = RuntimeConfig::new()
//!     .with_sleep_hook(board_sleep)
//!     .with_clock_hook(board_millis);
//!
//! // Precondition: install before the first sleep or timed wait.
//! let _ = config::install(config);
//! ```
//!
//! Installing twice fails with [`OsalError::AlreadyConfigured`]; the first
//! configuration stays in place for the life of the program.

use crate::errors::{OsalError, OsalResult};
use crate::thread::Priority;

/// Blocks the caller for the given number of milliseconds.
pub type SleepHook = fn(u32);

/// Returns a monotonic millisecond counter.
pub type ClockHook = fn() -> u64;

/// Stack size used when thread attributes leave it unset.
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Environment variable overriding [`DEFAULT_STACK_SIZE`] on hosted targets.
pub const STACK_SIZE_ENV: &str = "OSAL_STACK_SIZE";

/// Environment variable overriding the default thread priority on hosted targets.
pub const PRIORITY_ENV: &str = "OSAL_THREAD_PRIORITY";

static INSTALLED: spin::Once<RuntimeConfig> = spin::Once::new();

#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    sleep: Option<SleepHook>,
    clock: Option<ClockHook>,
    stack_size: usize,
    priority: Priority,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sleep: None,
            clock: None,
            stack_size: DEFAULT_STACK_SIZE,
            priority: Priority::NORMAL,
        }
    }

    #[must_use]
    pub const fn with_sleep_hook(mut self, hook: SleepHook) -> Self {
        self.sleep = Some(hook);
        self
    }

    #[must_use]
    pub const fn with_clock_hook(mut self, hook: ClockHook) -> Self {
        self.clock = Some(hook);
        self
    }

    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn sleep_hook(&self) -> Option<SleepHook> {
        self.sleep
    }

    #[must_use]
    pub const fn clock_hook(&self) -> Option<ClockHook> {
        self.clock
    }

    #[must_use]
    pub const fn stack_size(&self) -> usize {
        self.stack_size
    }

    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Sleeps through the configured hook.
    ///
    /// # Errors
    ///
    /// Returns [`OsalError::NotConfigured`] immediately, without sleeping,
    /// when no sleep hook was supplied.
    pub fn sleep_ms(&self, ms: u32) -> OsalResult<()> {
        match self.sleep {
            Some(hook) => {
                hook(ms);
                Ok(())
            }
            None => {
                tracing::error!("sleep_ms({}) called without a sleep hook installed", ms);
                Err(OsalError::NotConfigured)
            }
        }
    }

    #[must_use]
    pub fn now_ms(&self) -> Option<u64> {
        self.clock.map(|clock| clock())
    }

    /// Builds a configuration from the process environment.
    ///
    /// Reads [`STACK_SIZE_ENV`] and [`PRIORITY_ENV`]; unset or unparsable
    /// values keep their defaults.
    #[cfg(feature = "std")]
    #[must_use]
    pub fn from_env() -> Self {
        use std::env;
        use std::str::FromStr;

        let mut config = Self::new();

        match env::var(STACK_SIZE_ENV)
            .ok()
            .and_then(|s| usize::from_str(s.trim()).ok())
        {
            Some(size @ 1..) => {
                tracing::debug!("Retrieved stack size {} from {}", size, STACK_SIZE_ENV);
                config.stack_size = size;
            }
            _ => tracing::debug!("Using default stack size: {}", config.stack_size),
        }

        if let Some(level) = env::var(PRIORITY_ENV)
            .ok()
            .and_then(|s| u8::from_str(s.trim()).ok())
        {
            tracing::debug!("Retrieved thread priority {} from {}", level, PRIORITY_ENV);
            config.priority = Priority::new(level);
        }

        config
    }
}

/// Installs the process-wide configuration.
///
/// # Errors
///
/// Returns [`OsalError::AlreadyConfigured`] if a configuration was installed
/// before; the earlier one is kept.
pub fn install(config: RuntimeConfig) -> OsalResult<()> {
    let mut fresh = false;
    INSTALLED.call_once(|| {
        fresh = true;
        config
    });

    if fresh {
        tracing::debug!("Runtime configuration installed: {:?}", config);
        Ok(())
    } else {
        tracing::warn!("Runtime configuration already installed, ignoring new one");
        Err(OsalError::AlreadyConfigured)
    }
}

#[must_use]
pub fn installed() -> Option<&'static RuntimeConfig> {
    INSTALLED.get()
}

/// The installed configuration, or the defaults when none was installed.
#[must_use]
pub fn current() -> RuntimeConfig {
    installed().copied().unwrap_or_default()
}

/// Reads the installed clock hook.
#[must_use]
pub fn now_ms() -> Option<u64> {
    installed().and_then(RuntimeConfig::now_ms)
}
