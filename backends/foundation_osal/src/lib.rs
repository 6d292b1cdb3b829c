//! Portable runtime primitives for embedded and hosted targets.
//!
//! This crate provides a uniform set of blocking concurrency primitives that
//! behave the same whether they run on a desktop OS, a POSIX-like system, an
//! RTOS or a bare-metal loop without any OS:
//!
//! - [`ring::RingBuffer`]: fixed-capacity, unsynchronized circular storage of
//!   equally sized byte items.
//! - [`queue::SyncQueue`]: a ring buffer guarded by a mutex and two condition
//!   variables, with blocking send/receive, millisecond timeouts, an
//!   interrupt-context send that never waits, and teardown that releases every
//!   blocked waiter.
//! - [`mutex::OsMutex`]: recursive or non-recursive `take`/`give` lock.
//! - [`thread`]: thread creation, join, suspend/resume, sleep and
//!   introspection.
//! - [`native`]: forwarding adapters for RTOS ports that already provide a
//!   native queue or mutex.
//!
//! # Feature Flags
//!
//! - `std` (default): condition variables and mutexes come from `std::sync`
//!   and threads from `std::thread`.
//! - without `std`: `no_std + alloc`, spin-waiting primitives, and the
//!   bare-metal thread backend driven by hooks installed through
//!   [`config::install`].
//!
//! # Examples
//!
//! ```
//! use foundation_osal::queue::SyncQueue;
//! use foundation_osal::time::WAIT_FOREVER;
//!
//! let queue = SyncQueue::create(4, 4, "numbers").unwrap();
//! queue.send(&7u32.to_le_bytes(), WAIT_FOREVER).unwrap();
//!
//! let mut out = [0u8; 4];
//! queue.receive(&mut out, WAIT_FOREVER).unwrap();
//! assert_eq!(u32::from_le_bytes(out), 7);
//! ```

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![allow(clippy::module_name_repetitions)]

extern crate alloc;

pub mod config;
pub mod errors;
pub mod mutex;
pub mod native;
pub mod primitives;
pub mod queue;
pub mod registry;
pub mod ring;
pub mod thread;
pub mod time;

pub use errors::{OsalError, OsalResult};
pub use mutex::{MutexKind, OsMutex};
pub use queue::{IsrSend, QueueBackend, QueueLifecycle, SyncQueue};
pub use ring::RingBuffer;
pub use time::{NO_WAIT, WAIT_FOREVER};
