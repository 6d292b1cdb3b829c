//! Spin-waiting implementation for targets without an operating system.
//!
//! There is no scheduler to park a thread on, so waiters poll a generation
//! counter that every notification bumps. A notification wakes every current
//! waiter; callers re-check their condition after each wakeup anyway.

use core::cell::UnsafeCell;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use super::WaitTimeoutResult;
use crate::primitives::SpinWait;
use crate::time::Deadline;

pub struct CondVarMutex<T: ?Sized> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for CondVarMutex<T> {}
unsafe impl<T: ?Sized + Send> Sync for CondVarMutex<T> {}

pub struct CondVarMutexGuard<'a, T: ?Sized + 'a> {
    mutex: &'a CondVarMutex<T>,
}

unsafe impl<T: ?Sized + Sync> Sync for CondVarMutexGuard<'_, T> {}

impl<T> CondVarMutex<T> {
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> CondVarMutex<T> {
    pub fn lock(&self) -> CondVarMutexGuard<'_, T> {
        let mut spin_wait = SpinWait::new();
        loop {
            if let Some(guard) = self.try_lock_weak() {
                return guard;
            }
            spin_wait.snooze();
        }
    }

    #[inline]
    pub fn try_lock(&self) -> Option<CondVarMutexGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| CondVarMutexGuard { mutex: self })
    }

    #[inline]
    fn try_lock_weak(&self) -> Option<CondVarMutexGuard<'_, T>> {
        if self.locked.load(Ordering::Relaxed) {
            return None;
        }
        self.locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| CondVarMutexGuard { mutex: self })
    }

    /// # Safety
    ///
    /// Must only be called by the holder of the lock.
    #[inline]
    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

impl<'a, T: ?Sized> CondVarMutexGuard<'a, T> {
    #[inline]
    fn mutex(&self) -> &'a CondVarMutex<T> {
        self.mutex
    }
}

impl<T: ?Sized> Deref for CondVarMutexGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T: ?Sized> DerefMut for CondVarMutexGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T: ?Sized> Drop for CondVarMutexGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        unsafe {
            self.mutex.unlock();
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for CondVarMutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for CondVarMutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("CondVarMutex");
        match self.try_lock() {
            Some(guard) => d.field("data", &&*guard),
            None => d.field("data", &format_args!("<locked>")),
        };
        d.finish_non_exhaustive()
    }
}

impl<T: Default> Default for CondVarMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

pub struct CondVar {
    waiters: AtomicU32,
    generation: AtomicUsize,
}

impl CondVar {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            waiters: AtomicU32::new(0),
            generation: AtomicUsize::new(0),
        }
    }

    /// Registers as a waiter while the lock is still held, so a notifier
    /// that changes state under the same lock cannot be missed.
    #[inline]
    fn enter<T: ?Sized>(&self, guard: CondVarMutexGuard<'_, T>) -> usize {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        let gen = self.generation.load(Ordering::SeqCst);
        drop(guard);
        gen
    }

    #[inline]
    fn notified(&self, gen: usize) -> bool {
        self.generation.load(Ordering::SeqCst) != gen
    }

    pub fn wait<'a, T>(&self, guard: CondVarMutexGuard<'a, T>) -> CondVarMutexGuard<'a, T> {
        let mutex = guard.mutex();
        let gen = self.enter(guard);

        let mut spin_wait = SpinWait::new();
        while !self.notified(gen) {
            spin_wait.snooze();
        }

        self.waiters.fetch_sub(1, Ordering::SeqCst);
        mutex.lock()
    }

    /// Waits for a notification or until `deadline` passes.
    pub fn wait_until<'a, T>(
        &self,
        guard: CondVarMutexGuard<'a, T>,
        deadline: &Deadline,
    ) -> (CondVarMutexGuard<'a, T>, WaitTimeoutResult) {
        if deadline.has_elapsed() {
            return (guard, WaitTimeoutResult::new(true));
        }

        let mutex = guard.mutex();
        let gen = self.enter(guard);

        let mut spin_wait = SpinWait::new();
        let timed_out = loop {
            if self.notified(gen) {
                break false;
            }
            if deadline.has_elapsed() {
                break !self.notified(gen);
            }
            spin_wait.snooze();
        };

        self.waiters.fetch_sub(1, Ordering::SeqCst);
        (mutex.lock(), WaitTimeoutResult::new(timed_out))
    }

    /// Wakes waiters. May wake more than one.
    #[inline]
    pub fn notify_one(&self) {
        self.bump();
    }

    #[inline]
    pub fn notify_all(&self) {
        self.bump();
    }

    #[inline]
    fn bump(&self) {
        if self.waiters.load(Ordering::SeqCst) > 0 {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Default for CondVar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CondVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CondVar")
            .field("waiters", &self.waiters.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    /// `WHY`: Spin waiters must observe state published under the lock
    /// `WHAT`: A waiter blocked on a flag wakes once another thread sets it and notifies
    #[test]
    #[ntest::timeout(5000)]
    fn wait_wakes_on_notify() {
        let pair = Arc::new((CondVarMutex::new(false), CondVar::new()));
        let setter = Arc::clone(&pair);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let (lock, signal) = &*setter;
            *lock.lock() = true;
            signal.notify_one();
        });

        let (lock, signal) = &*pair;
        let mut ready = lock.lock();
        while !*ready {
            ready = signal.wait(ready);
        }
        drop(ready);
        handle.join().unwrap();
    }

    /// `WHY`: Timed spin waits must honour the deadline without a scheduler
    /// `WHAT`: Waiting with nobody notifying times out close to the deadline
    #[test]
    #[cfg(feature = "std")]
    fn wait_until_times_out() {
        let lock = CondVarMutex::new(());
        let signal = CondVar::new();

        let started = Instant::now();
        let deadline = Deadline::after_millis(30);
        let (_guard, result) = signal.wait_until(lock.lock(), &deadline);

        assert!(result.timed_out());
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    /// `WHY`: An already elapsed deadline must not register a waiter
    /// `WHAT`: `wait_until` returns immediately with the guard still held
    #[test]
    #[cfg(feature = "std")]
    fn elapsed_deadline_returns_immediately() {
        let lock = CondVarMutex::new(5u8);
        let signal = CondVar::new();

        let (guard, result) = signal.wait_until(lock.lock(), &Deadline::after_millis(0));
        assert!(result.timed_out());
        assert_eq!(*guard, 5);
        assert!(lock.try_lock().is_none());
    }

    /// `WHY`: Mutual exclusion is the base of every structure above
    /// `WHAT`: Concurrent increments under the spin lock are never lost
    #[test]
    fn lock_serialises_increments() {
        let counter = Arc::new(CondVarMutex::new(0u32));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *counter.lock() += 1;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*counter.lock(), 4000);
    }
}
