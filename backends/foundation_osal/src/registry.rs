//! Named lookup of shared objects.
//!
//! A [`Registry`] is an ordinary value owned by whoever needs names, usually
//! the platform integration at startup. There is no process-wide default
//! registry.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::errors::{OsalError, OsalResult};
use crate::primitives::CondVarMutex;

pub struct Registry<T: ?Sized> {
    entries: CondVarMutex<BTreeMap<String, Arc<T>>>,
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Registry<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: CondVarMutex::new(BTreeMap::new()),
        }
    }

    /// # Errors
    ///
    /// [`OsalError::AlreadyExists`] if `name` is taken; the registry keeps
    /// the earlier object.
    pub fn register(&self, name: &str, object: Arc<T>) -> OsalResult<()> {
        let mut entries = self.entries.lock();
        if entries.contains_key(name) {
            tracing::warn!("Registry already holds an object named {:?}", name);
            return Err(OsalError::AlreadyExists);
        }

        entries.insert(String::from(name), object);
        tracing::debug!("Registered {:?}", name);
        Ok(())
    }

    /// # Errors
    ///
    /// [`OsalError::NotFound`] if nothing carries `name`.
    pub fn open(&self, name: &str) -> OsalResult<Arc<T>> {
        self.entries
            .lock()
            .get(name)
            .cloned()
            .ok_or(OsalError::NotFound)
    }

    /// Removes `name` and returns the registry's handle to it.
    ///
    /// Other handles stay valid; the object lives until the last one drops.
    ///
    /// # Errors
    ///
    /// [`OsalError::NotFound`] if nothing carries `name`.
    pub fn close(&self, name: &str) -> OsalResult<Arc<T>> {
        let removed = self.entries.lock().remove(name);
        match removed {
            Some(object) => {
                tracing::debug!("Closed {:?}", name);
                Ok(object)
            }
            None => Err(OsalError::NotFound),
        }
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{QueueBackend, SyncQueue};
    use crate::time::NO_WAIT;

    #[test]
    fn open_returns_the_registered_object() {
        let registry: Registry<SyncQueue> = Registry::new();
        let queue = SyncQueue::create(2, 1, "events").unwrap();
        registry.register("events", Arc::clone(&queue)).unwrap();

        let opened = registry.open("events").unwrap();
        opened.send(&[9], NO_WAIT).unwrap();
        assert_eq!(queue.count(), 1);
    }

    #[test]
    fn duplicate_names_are_refused() {
        let registry: Registry<u32> = Registry::new();
        registry.register("a", Arc::new(1)).unwrap();
        assert_eq!(
            registry.register("a", Arc::new(2)),
            Err(OsalError::AlreadyExists)
        );
        assert_eq!(*registry.open("a").unwrap(), 1);
    }

    #[test]
    fn close_unpublishes_but_keeps_handles_alive() {
        let registry: Registry<u32> = Registry::new();
        registry.register("b", Arc::new(5)).unwrap();
        let held = registry.open("b").unwrap();

        let closed = registry.close("b").unwrap();
        assert!(Arc::ptr_eq(&held, &closed));
        assert_eq!(registry.open("b").unwrap_err(), OsalError::NotFound);
        assert_eq!(registry.close("b").unwrap_err(), OsalError::NotFound);
        assert!(registry.is_empty());
    }

    #[test]
    fn names_are_sorted() {
        let registry: Registry<dyn QueueBackend> = Registry::new();
        for name in ["tx", "rx", "log"] {
            let queue: Arc<dyn QueueBackend> = SyncQueue::create(1, 1, name).unwrap();
            registry.register(name, queue).unwrap();
        }
        assert_eq!(registry.names(), ["log", "rx", "tx"]);
        assert_eq!(registry.len(), 3);
    }
}
