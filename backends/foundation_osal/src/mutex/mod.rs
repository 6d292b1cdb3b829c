//! Ownership-tracking mutex with RTOS-style `take`/`give`.
//!
//! Unlike a scoped Rust lock, [`OsMutex`] can be taken in one function and
//! given back in another, as collaborators written against an RTOS expect.
//! [`OsMutex::lock`] offers the scoped form on top.
//!
//! ```
//! use foundation_osal::mutex::{MutexKind, OsMutex};
//!
//! let mutex = OsMutex::create("bus", MutexKind::Recursive).unwrap();
//! mutex.take().unwrap();
//! mutex.take().unwrap();
//! mutex.give().unwrap();
//! mutex.give().unwrap();
//! assert!(!mutex.is_locked());
//! ```

pub mod owner;

use alloc::string::String;
use alloc::sync::Arc;

use crate::errors::{OsalError, OsalResult};
use crate::primitives::{CondVar, CondVarMutex};
use crate::registry::Registry;
use crate::time::{Timeout, NO_WAIT, WAIT_FOREVER};

pub use owner::OwnerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexKind {
    /// A second `take` by the owner fails with [`OsalError::WouldDeadlock`].
    Normal,
    /// The owner may take again; it is released after as many `give`s.
    Recursive,
}

#[derive(Debug, Default)]
struct Ownership {
    owner: Option<OwnerId>,
    depth: usize,
    destroyed: bool,
}

pub struct OsMutex {
    name: String,
    kind: MutexKind,
    state: CondVarMutex<Ownership>,
    released: CondVar,
}

impl OsMutex {
    /// # Errors
    ///
    /// Never fails on the backends shipped here; the signature matches the
    /// other `create` functions.
    pub fn create(name: &str, kind: MutexKind) -> OsalResult<Arc<Self>> {
        tracing::debug!("Created {:?} mutex {:?}", kind, name);
        Ok(Arc::new(Self {
            name: String::from(name),
            kind,
            state: CondVarMutex::new(Ownership::default()),
            released: CondVar::new(),
        }))
    }

    /// Creates a mutex and publishes it in `registry` under `name`.
    ///
    /// # Errors
    ///
    /// [`OsalError::AlreadyExists`] if the name is taken.
    pub fn create_named(
        registry: &Registry<OsMutex>,
        name: &str,
        kind: MutexKind,
    ) -> OsalResult<Arc<Self>> {
        let mutex = Self::create(name, kind)?;
        registry.register(name, Arc::clone(&mutex))?;
        Ok(mutex)
    }

    /// Looks up a mutex previously published with [`OsMutex::create_named`].
    ///
    /// # Errors
    ///
    /// [`OsalError::NotFound`] if nothing is registered under `name`.
    pub fn open(registry: &Registry<OsMutex>, name: &str) -> OsalResult<Arc<Self>> {
        registry.open(name)
    }

    /// Blocks until the mutex is acquired.
    ///
    /// # Errors
    ///
    /// [`OsalError::WouldDeadlock`] when a [`MutexKind::Normal`] mutex is
    /// taken again by its owner, [`OsalError::Destroyed`] after destroy.
    pub fn take(&self) -> OsalResult<()> {
        self.take_timeout(WAIT_FOREVER)
    }

    /// # Errors
    ///
    /// [`OsalError::WouldBlock`] when another context holds the mutex, plus
    /// the errors of [`OsMutex::take`].
    pub fn try_take(&self) -> OsalResult<()> {
        self.take_timeout(NO_WAIT)
    }

    /// Waits at most `timeout_ms` for the mutex.
    ///
    /// # Errors
    ///
    /// [`OsalError::Timeout`] when the deadline passes, plus the errors of
    /// [`OsMutex::try_take`].
    pub fn take_timeout(&self, timeout_ms: u32) -> OsalResult<()> {
        let me = owner::current();
        let timeout = Timeout::from_millis(timeout_ms);
        let deadline = timeout.deadline();

        let mut state = self.state.lock();
        loop {
            if state.destroyed {
                return Err(OsalError::Destroyed);
            }

            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    return Ok(());
                }
                Some(owner) if owner == me => {
                    return match self.kind {
                        MutexKind::Recursive => {
                            state.depth += 1;
                            Ok(())
                        }
                        MutexKind::Normal => {
                            tracing::warn!("Mutex {:?} taken again by its owner", self.name);
                            Err(OsalError::WouldDeadlock)
                        }
                    };
                }
                Some(_) => {}
            }

            state = match (timeout, deadline.as_ref()) {
                (Timeout::Poll, _) => return Err(OsalError::WouldBlock),
                (_, Some(deadline)) => {
                    if deadline.has_elapsed() {
                        return Err(OsalError::Timeout);
                    }
                    self.released.wait_until(state, deadline).0
                }
                (_, None) => self.released.wait(state),
            };
        }
    }

    /// Releases one level of ownership.
    ///
    /// # Errors
    ///
    /// [`OsalError::NotOwner`] when the caller does not hold the mutex,
    /// [`OsalError::Destroyed`] after destroy.
    pub fn give(&self) -> OsalResult<()> {
        let me = owner::current();
        let mut state = self.state.lock();

        if state.destroyed {
            return Err(OsalError::Destroyed);
        }

        if state.owner != Some(me) {
            tracing::warn!("Mutex {:?} given by a context that does not own it", self.name);
            return Err(OsalError::NotOwner);
        }

        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            self.released.notify_one();
        }
        Ok(())
    }

    /// Takes the mutex and gives it back when the guard drops.
    ///
    /// # Errors
    ///
    /// Same as [`OsMutex::take`].
    pub fn lock(&self) -> OsalResult<OsMutexGuard<'_>> {
        self.take()?;
        Ok(OsMutexGuard { mutex: self })
    }

    /// Whether anybody holds the mutex right now. A hint.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Fails every current and later waiter with [`OsalError::Destroyed`].
    pub fn destroy(&self) {
        let mut state = self.state.lock();
        if state.destroyed {
            tracing::warn!("Mutex {:?} destroyed more than once", self.name);
            return;
        }

        if state.owner.is_some() {
            tracing::warn!("Mutex {:?} destroyed while held", self.name);
        }

        state.destroyed = true;
        state.owner = None;
        state.depth = 0;
        self.released.notify_all();
        tracing::debug!("Destroyed mutex {:?}", self.name);
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

impl core::fmt::Debug for OsMutex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OsMutex")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Gives the mutex back on drop.
#[must_use = "the mutex is given back as soon as the guard drops"]
pub struct OsMutexGuard<'a> {
    mutex: &'a OsMutex,
}

impl Drop for OsMutexGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.mutex.give() {
            tracing::warn!("Guard for mutex {:?} could not give: {}", self.mutex.name, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_mutex_detects_self_deadlock() {
        let mutex = OsMutex::create("normal", MutexKind::Normal).unwrap();
        mutex.take().unwrap();
        assert_eq!(mutex.take(), Err(OsalError::WouldDeadlock));
        mutex.give().unwrap();
        assert!(!mutex.is_locked());
    }

    #[test]
    fn recursive_mutex_counts_depth() {
        let mutex = OsMutex::create("recursive", MutexKind::Recursive).unwrap();
        mutex.take().unwrap();
        mutex.take().unwrap();

        mutex.give().unwrap();
        assert!(mutex.is_locked());
        mutex.give().unwrap();
        assert!(!mutex.is_locked());
        assert_eq!(mutex.give(), Err(OsalError::NotOwner));
    }

    #[test]
    fn guard_gives_on_drop() {
        let mutex = OsMutex::create("guarded", MutexKind::Normal).unwrap();
        {
            let _guard = mutex.lock().unwrap();
            assert!(mutex.is_locked());
        }
        assert!(!mutex.is_locked());
    }

    #[test]
    fn destroyed_mutex_refuses_everything() {
        let mutex = OsMutex::create("gone", MutexKind::Normal).unwrap();
        mutex.take().unwrap();
        mutex.destroy();

        assert_eq!(mutex.take(), Err(OsalError::Destroyed));
        assert_eq!(mutex.give(), Err(OsalError::Destroyed));
        assert!(!mutex.is_locked());
        mutex.destroy();
    }

    #[test]
    fn named_mutexes_are_found_through_registry() {
        let registry = Registry::new();
        let created = OsMutex::create_named(&registry, "uart", MutexKind::Normal).unwrap();

        let opened = OsMutex::open(&registry, "uart").unwrap();
        assert!(Arc::ptr_eq(&created, &opened));
        assert_eq!(
            OsMutex::create_named(&registry, "uart", MutexKind::Normal).unwrap_err(),
            OsalError::AlreadyExists
        );
        assert_eq!(
            OsMutex::open(&registry, "spi").unwrap_err(),
            OsalError::NotFound
        );
    }

    #[cfg(feature = "std")]
    mod when_std {
        use super::*;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;
        use std::time::{Duration, Instant};

        #[test]
        fn contended_mutex_reports_would_block_and_timeout() {
            let mutex = OsMutex::create("contended", MutexKind::Normal).unwrap();
            mutex.take().unwrap();

            let other = Arc::clone(&mutex);
            let (polled, timed, elapsed) = thread::spawn(move || {
                let polled = other.try_take();
                let started = Instant::now();
                let timed = other.take_timeout(50);
                (polled, timed, started.elapsed())
            })
            .join()
            .unwrap();

            assert_eq!(polled, Err(OsalError::WouldBlock));
            assert_eq!(timed, Err(OsalError::Timeout));
            assert!(elapsed >= Duration::from_millis(45));
            mutex.give().unwrap();
        }

        #[test]
        fn give_from_other_thread_is_rejected() {
            let mutex = OsMutex::create("owned", MutexKind::Normal).unwrap();
            mutex.take().unwrap();

            let other = Arc::clone(&mutex);
            let result = thread::spawn(move || other.give()).join().unwrap();
            assert_eq!(result, Err(OsalError::NotOwner));
            assert!(mutex.is_locked());
            mutex.give().unwrap();
        }

        #[test]
        #[ntest::timeout(5000)]
        fn waiter_acquires_after_give() {
            let mutex = OsMutex::create("handoff", MutexKind::Normal).unwrap();
            let acquired = Arc::new(AtomicBool::new(false));
            mutex.take().unwrap();

            let waiter = {
                let mutex = Arc::clone(&mutex);
                let acquired = Arc::clone(&acquired);
                thread::spawn(move || {
                    mutex.take().unwrap();
                    acquired.store(true, Ordering::SeqCst);
                    mutex.give().unwrap();
                })
            };

            thread::sleep(Duration::from_millis(30));
            assert!(!acquired.load(Ordering::SeqCst));
            mutex.give().unwrap();

            waiter.join().unwrap();
            assert!(acquired.load(Ordering::SeqCst));
        }

        #[test]
        #[ntest::timeout(5000)]
        fn destroy_releases_blocked_taker() {
            let mutex = OsMutex::create("teardown", MutexKind::Normal).unwrap();
            mutex.take().unwrap();

            let waiter = {
                let mutex = Arc::clone(&mutex);
                thread::spawn(move || mutex.take())
            };

            thread::sleep(Duration::from_millis(30));
            mutex.destroy();
            assert_eq!(waiter.join().unwrap(), Err(OsalError::Destroyed));
        }
    }
}
