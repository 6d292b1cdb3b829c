//! Locking building blocks shared by every higher-level primitive.
//!
//! [`CondVarMutex`] and [`CondVar`] expose one API on every target. With the
//! `std` feature they wrap `std::sync`; without it they spin on atomics with
//! exponential backoff through [`SpinWait`].
//!
//! Locks recover from poisoning: a panic in another thread while holding the
//! lock does not make the protected state unreachable. Every structure built
//! on top keeps its invariants between statements, so the recovered state is
//! still consistent.

pub mod condvar;
pub mod spin_wait;

pub use condvar::{CondVar, CondVarMutex, CondVarMutexGuard, WaitTimeoutResult};
pub use spin_wait::SpinWait;
