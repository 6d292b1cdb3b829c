//! Fixed-capacity circular storage of equally sized byte items.
//!
//! [`RingBuffer`] performs no synchronization of its own; callers serialize
//! access (the [`SyncQueue`](crate::queue::SyncQueue) does so with its mutex).
//!
//! Occupancy is tracked in an explicit counter rather than derived from the
//! indices, so `head == tail` is unambiguous: `count` tells full from empty.
//!
//! ```
//! use foundation_osal::ring::RingBuffer;
//!
//! let mut storage = [0u8; 12];
//! let mut ring = RingBuffer::init(&mut storage, 4).unwrap();
//! assert_eq!(ring.capacity(), 3);
//!
//! ring.push(&[1, 2, 3, 4]).unwrap();
//! let mut out = [0u8; 4];
//! ring.pop(&mut out).unwrap();
//! assert_eq!(out, [1, 2, 3, 4]);
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use crate::errors::{OsalError, OsalResult};

enum Storage<'a> {
    Borrowed(&'a mut [u8]),
    Owned(Box<[u8]>),
    Released,
}

impl Storage<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Borrowed(bytes) => bytes,
            Self::Owned(bytes) => bytes,
            Self::Released => &[],
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Borrowed(bytes) => bytes,
            Self::Owned(bytes) => bytes,
            Self::Released => &mut [],
        }
    }
}

pub struct RingBuffer<'a> {
    storage: Storage<'a>,
    item_size: usize,
    max_items: usize,
    head: usize,
    tail: usize,
    count: usize,
}

impl<'a> RingBuffer<'a> {
    /// Uses caller-supplied storage holding `storage.len() / item_size` items.
    ///
    /// Trailing bytes that do not fill a whole slot are never touched.
    ///
    /// # Errors
    ///
    /// [`OsalError::InvalidArgument`] if `item_size` is zero or the storage
    /// cannot hold a single item.
    pub fn init(storage: &'a mut [u8], item_size: usize) -> OsalResult<Self> {
        if item_size == 0 {
            return Err(OsalError::InvalidArgument);
        }

        let max_items = storage.len() / item_size;
        if max_items == 0 {
            return Err(OsalError::InvalidArgument);
        }

        Ok(Self::with_storage(Storage::Borrowed(storage), max_items, item_size))
    }

    fn with_storage(storage: Storage<'a>, max_items: usize, item_size: usize) -> Self {
        Self {
            storage,
            item_size,
            max_items,
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    #[inline]
    fn slot(&self, index: usize) -> Range<usize> {
        let start = index * self.item_size;
        start..start + self.item_size
    }

    fn check_item(&self, len: usize) -> OsalResult<()> {
        if self.max_items == 0 || len != self.item_size {
            return Err(OsalError::InvalidArgument);
        }
        Ok(())
    }

    /// Copies `item` into the next free slot.
    ///
    /// # Errors
    ///
    /// [`OsalError::Full`] when every slot is occupied,
    /// [`OsalError::InvalidArgument`] when `item.len() != item_size` or the
    /// buffer was destroyed. The buffer is unchanged on error.
    pub fn push(&mut self, item: &[u8]) -> OsalResult<()> {
        self.check_item(item.len())?;
        if self.is_full() {
            return Err(OsalError::Full);
        }

        let slot = self.slot(self.head);
        self.storage.bytes_mut()[slot].copy_from_slice(item);
        self.head = (self.head + 1) % self.max_items;
        self.count += 1;
        Ok(())
    }

    /// Moves the oldest item into `out`.
    ///
    /// # Errors
    ///
    /// [`OsalError::Empty`] when nothing is stored,
    /// [`OsalError::InvalidArgument`] when `out.len() != item_size` or the
    /// buffer was destroyed.
    pub fn pop(&mut self, out: &mut [u8]) -> OsalResult<()> {
        self.peek(out)?;
        self.tail = (self.tail + 1) % self.max_items;
        self.count -= 1;
        Ok(())
    }

    /// Copies the oldest item into `out` without removing it.
    ///
    /// # Errors
    ///
    /// Same as [`RingBuffer::pop`].
    pub fn peek(&self, out: &mut [u8]) -> OsalResult<()> {
        self.check_item(out.len())?;
        if self.is_empty() {
            return Err(OsalError::Empty);
        }

        out.copy_from_slice(&self.storage.bytes()[self.slot(self.tail)]);
        Ok(())
    }

    /// Logically empties the buffer. Stored bytes are left as they are.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// Occupancy ratio in `[0.0, 1.0]`; `0.0` for a destroyed buffer.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn usage(&self) -> f32 {
        if self.max_items == 0 {
            return 0.0;
        }
        self.count as f32 / self.max_items as f32
    }

    /// Tears the buffer down and zeroes every index.
    ///
    /// Owned storage is freed when `release_storage` is set; otherwise it is
    /// handed back to the caller. Borrowed storage is never freed, the borrow
    /// simply ends.
    pub fn destroy(&mut self, release_storage: bool) -> Option<Box<[u8]>> {
        let storage = core::mem::replace(&mut self.storage, Storage::Released);
        self.item_size = 0;
        self.max_items = 0;
        self.clear();

        match storage {
            Storage::Owned(bytes) if !release_storage => Some(bytes),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_items
    }

    #[inline]
    #[must_use]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    #[inline]
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.max_items - self.count
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count == self.max_items
    }

    #[inline]
    #[must_use]
    pub fn owns_storage(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }
}

impl RingBuffer<'static> {
    /// Allocates storage for `max_items` items of `item_size` bytes.
    ///
    /// # Errors
    ///
    /// [`OsalError::InvalidArgument`] for a zero count or size,
    /// [`OsalError::AllocationFailed`] if the byte size overflows or the
    /// allocator refuses the request.
    pub fn init_owned(max_items: usize, item_size: usize) -> OsalResult<Self> {
        if max_items == 0 || item_size == 0 {
            return Err(OsalError::InvalidArgument);
        }

        let bytes = max_items
            .checked_mul(item_size)
            .ok_or(OsalError::AllocationFailed)?;

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(bytes)
            .map_err(|_| OsalError::AllocationFailed)?;
        storage.resize(bytes, 0);

        Ok(Self::with_storage(
            Storage::Owned(storage.into_boxed_slice()),
            max_items,
            item_size,
        ))
    }
}

impl fmt::Debug for RingBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("item_size", &self.item_size)
            .field("max_items", &self.max_items)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("count", &self.count)
            .field("owns_storage", &self.owns_storage())
            .finish()
    }
}
