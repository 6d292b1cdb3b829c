//! Hosted implementation over `std::sync`.

use std::sync::{Condvar, Mutex, PoisonError, TryLockError};

use super::WaitTimeoutResult;
use crate::time::Deadline;

pub type CondVarMutexGuard<'a, T> = std::sync::MutexGuard<'a, T>;

#[derive(Debug, Default)]
pub struct CondVarMutex<T: ?Sized>(Mutex<T>);

impl<T> CondVarMutex<T> {
    #[inline]
    pub const fn new(data: T) -> Self {
        Self(Mutex::new(data))
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.0.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ?Sized> CondVarMutex<T> {
    /// Acquires the mutex, recovering the guard if a previous holder panicked.
    #[inline]
    pub fn lock(&self) -> CondVarMutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the mutex only if nobody holds it.
    #[inline]
    pub fn try_lock(&self) -> Option<CondVarMutexGuard<'_, T>> {
        match self.0.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(err)) => Some(err.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct CondVar(Condvar);

impl CondVar {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(Condvar::new())
    }

    #[inline]
    pub fn wait<'a, T>(&self, guard: CondVarMutexGuard<'a, T>) -> CondVarMutexGuard<'a, T> {
        self.0.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for a notification or until `deadline` passes.
    pub fn wait_until<'a, T>(
        &self,
        guard: CondVarMutexGuard<'a, T>,
        deadline: &Deadline,
    ) -> (CondVarMutexGuard<'a, T>, WaitTimeoutResult) {
        let remaining = deadline.remaining();
        if remaining.is_zero() {
            return (guard, WaitTimeoutResult::new(true));
        }

        let (guard, result) = self
            .0
            .wait_timeout(guard, remaining)
            .unwrap_or_else(PoisonError::into_inner);
        (guard, WaitTimeoutResult::new(result.timed_out()))
    }

    #[inline]
    pub fn notify_one(&self) {
        self.0.notify_one();
    }

    #[inline]
    pub fn notify_all(&self) {
        self.0.notify_all();
    }
}
