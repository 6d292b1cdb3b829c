use derive_more::From;

pub type OsalResult<T> = core::result::Result<T, OsalError>;

/// Failures reported by every primitive in this crate.
///
/// Nothing here is fatal: every variant is returned to the caller, which
/// decides whether to retry, give up or tear down.
#[derive(From, Debug)]
pub enum OsalError {
    /// Zero capacity, zero item size, wrong item length or an uninitialized
    /// buffer.
    InvalidArgument,
    /// Backing storage could not be allocated.
    AllocationFailed,

    /// The queue had no free slot and the caller asked not to wait.
    Full,
    /// The queue had no item and the caller asked not to wait.
    Empty,
    /// The deadline elapsed before the condition was met.
    Timeout,
    /// The lock was contended and the caller must not block.
    WouldBlock,
    /// The queue was destroyed before or while the caller waited on it.
    Destroyed,

    /// `give` was called by a thread that does not own the mutex.
    NotOwner,
    /// A non-recursive mutex was taken again by its owner.
    WouldDeadlock,

    /// A required hook of the runtime configuration was never installed.
    NotConfigured,
    /// The runtime configuration was already installed.
    AlreadyConfigured,
    /// The backend has no equivalent for the requested operation.
    Unsupported,
    /// No registered object carries the requested name.
    NotFound,
    /// A registered object already carries the requested name.
    AlreadyExists,

    /// The joined thread panicked.
    Join,

    #[cfg(feature = "std")]
    #[from(ignore)]
    Spawn(std::io::Error),
}

impl OsalError {
    /// Returns true for the expected, recoverable failures of a queue
    /// operation: no slot, no item, deadline elapsed, contended lock or a
    /// queue torn down while waiting.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Full | Self::Empty | Self::Timeout | Self::WouldBlock | Self::Destroyed
        )
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        matches!(self, Self::Destroyed)
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for OsalError {
    fn from(value: std::io::Error) -> Self {
        Self::Spawn(value)
    }
}

impl Eq for OsalError {}

impl PartialEq for OsalError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            #[cfg(feature = "std")]
            (Self::Spawn(m1), Self::Spawn(m2)) => m1.kind() == m2.kind(),
            #[cfg(feature = "std")]
            (Self::Spawn(_), _) | (_, Self::Spawn(_)) => false,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl core::error::Error for OsalError {}

impl core::fmt::Display for OsalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_groups_capacity_timeout_and_teardown() {
        assert!(OsalError::Full.is_unavailable());
        assert!(OsalError::Empty.is_unavailable());
        assert!(OsalError::Timeout.is_unavailable());
        assert!(OsalError::WouldBlock.is_unavailable());
        assert!(OsalError::Destroyed.is_unavailable());

        assert!(!OsalError::InvalidArgument.is_unavailable());
        assert!(!OsalError::NotOwner.is_unavailable());
    }

    #[test]
    fn destroyed_and_timeout_stay_distinguishable() {
        assert_ne!(OsalError::Destroyed, OsalError::Timeout);
        assert!(OsalError::Destroyed.is_destroyed());
        assert!(OsalError::Timeout.is_timeout());
    }

    #[test]
    #[cfg(feature = "std")]
    fn spawn_errors_compare_by_kind() {
        let a = OsalError::from(std::io::Error::from(std::io::ErrorKind::OutOfMemory));
        let b = OsalError::from(std::io::Error::from(std::io::ErrorKind::OutOfMemory));
        let c = OsalError::from(std::io::Error::from(std::io::ErrorKind::Other));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, OsalError::AllocationFailed);
    }

    #[test]
    fn display_uses_variant_name() {
        assert_eq!(alloc::format!("{}", OsalError::Full), "Full");
    }
}
