//! Hosted backend over `std::thread`.

use std::cell::RefCell;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::{Priority, ThreadAttributes};
use crate::config;
use crate::errors::{OsalError, OsalResult};
use crate::primitives::{CondVar, CondVarMutex};

struct ThreadControl {
    name: String,
    priority: Priority,
    stack_size: usize,
    suspended: CondVarMutex<bool>,
    resumed: CondVar,
}

thread_local! {
    static CURRENT: RefCell<Option<ThreadHandle>> = const { RefCell::new(None) };
}

/// Shared view of a thread: identity plus suspend/resume control.
#[derive(Clone)]
pub struct ThreadHandle(Arc<ThreadControl>);

impl ThreadHandle {
    fn new(name: String, priority: Priority, stack_size: usize) -> Self {
        Self(Arc::new(ThreadControl {
            name,
            priority,
            stack_size,
            suspended: CondVarMutex::new(false),
            resumed: CondVar::new(),
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn priority(&self) -> Priority {
        self.0.priority
    }

    #[must_use]
    pub fn stack_size(&self) -> usize {
        self.0.stack_size
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        *self.0.suspended.lock()
    }

    #[must_use]
    pub fn is_current(&self) -> bool {
        CURRENT.with(|current| {
            current
                .borrow()
                .as_ref()
                .is_some_and(|handle| Arc::ptr_eq(&handle.0, &self.0))
        })
    }

    /// Marks the thread suspended.
    ///
    /// Another thread parks at its next suspension point. The calling thread
    /// itself parks right away, until some other thread resumes it.
    pub fn suspend(&self) {
        *self.0.suspended.lock() = true;
        tracing::debug!("Suspended thread {:?}", self.0.name);

        if self.is_current() {
            self.park_while_suspended();
        }
    }

    pub fn resume(&self) {
        let mut suspended = self.0.suspended.lock();
        if *suspended {
            *suspended = false;
            self.0.resumed.notify_all();
            tracing::debug!("Resumed thread {:?}", self.0.name);
        }
    }

    fn park_while_suspended(&self) {
        let mut suspended = self.0.suspended.lock();
        while *suspended {
            suspended = self.0.resumed.wait(suspended);
        }
    }
}

impl core::fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadHandle")
            .field("name", &self.0.name)
            .field("priority", &self.0.priority)
            .finish_non_exhaustive()
    }
}

/// The calling thread's handle.
///
/// Threads not started through [`Thread`] (the main thread, for one) are
/// adopted on first call with their std name and the configured defaults.
#[must_use]
pub fn current() -> ThreadHandle {
    CURRENT.with(|current| {
        current
            .borrow_mut()
            .get_or_insert_with(|| {
                let config = config::current();
                let name = std::thread::current()
                    .name()
                    .map_or_else(|| String::from("<unnamed>"), String::from);
                ThreadHandle::new(name, config.priority(), config.stack_size())
            })
            .clone()
    })
}

/// Parks the caller while its handle is marked suspended.
pub fn checkpoint() {
    current().park_while_suspended();
}

/// Sleeps the calling thread, honouring suspension before and after.
///
/// # Errors
///
/// Never fails on this backend.
pub fn sleep_ms(ms: u32) -> OsalResult<()> {
    checkpoint();
    std::thread::sleep(Duration::from_millis(u64::from(ms)));
    checkpoint();
    Ok(())
}

pub fn yield_now() {
    checkpoint();
    std::thread::yield_now();
}

/// An owned, joinable thread.
#[derive(Debug)]
pub struct Thread {
    handle: ThreadHandle,
    join: Option<JoinHandle<()>>,
}

impl Thread {
    /// Starts `entry(parameter)` on a new thread.
    ///
    /// # Errors
    ///
    /// See [`Thread::spawn`].
    pub fn create<P>(entry: fn(P), parameter: P, attributes: ThreadAttributes) -> OsalResult<Self>
    where
        P: Send + 'static,
    {
        Self::spawn(attributes, move || entry(parameter))
    }

    /// Starts `f` on a new thread.
    ///
    /// # Errors
    ///
    /// [`OsalError::InvalidArgument`] for a name with a NUL byte or a zero
    /// stack size, [`OsalError::Spawn`] when the OS refuses the thread.
    pub fn spawn<F>(attributes: ThreadAttributes, f: F) -> OsalResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let config = config::current();
        let name = attributes.name().unwrap_or("osal-thread");
        let priority = attributes.priority().unwrap_or(config.priority());
        let stack_size = attributes.stack_size().unwrap_or(config.stack_size());

        if name.contains('\0') || stack_size == 0 {
            return Err(OsalError::InvalidArgument);
        }

        let handle = ThreadHandle::new(String::from(name), priority, stack_size);
        let inner = handle.clone();

        let join = std::thread::Builder::new()
            .name(String::from(name))
            .stack_size(stack_size)
            .spawn(move || {
                CURRENT.with(|current| *current.borrow_mut() = Some(inner));
                checkpoint();
                f();
            })?;

        tracing::debug!(
            "Spawned thread {:?} (priority {}, stack {} bytes)",
            name,
            priority.level(),
            stack_size
        );

        Ok(Self {
            handle,
            join: Some(join),
        })
    }

    /// Waits for the thread to finish.
    ///
    /// # Errors
    ///
    /// [`OsalError::Join`] if the thread panicked.
    pub fn join(mut self) -> OsalResult<()> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };

        match join.join() {
            Ok(()) => {
                tracing::debug!("Joined thread {:?}", self.handle.name());
                Ok(())
            }
            Err(_) => {
                tracing::warn!("Thread {:?} panicked", self.handle.name());
                Err(OsalError::Join)
            }
        }
    }

    pub fn suspend(&self) {
        self.handle.suspend();
    }

    pub fn resume(&self) {
        self.handle.resume();
    }

    /// Lets the thread run on unobserved. Std threads cannot be killed, so
    /// this detaches it; a suspended thread is resumed first so it can finish.
    pub fn destroy(mut self) {
        self.handle.resume();
        drop(self.join.take());
        tracing::debug!("Detached thread {:?}", self.handle.name());
    }

    #[must_use]
    pub fn handle(&self) -> &ThreadHandle {
        &self.handle
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    #[must_use]
    pub fn priority(&self) -> Priority {
        self.handle.priority()
    }

    #[must_use]
    pub fn stack_size(&self) -> usize {
        self.handle.stack_size()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }
}
