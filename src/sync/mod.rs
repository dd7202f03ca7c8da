//! Synchronization primitives underneath the manager.
//!
//! One [`parking_lot::Mutex`] protects the whole of a manager's state; the
//! [`Monitor`]s here are the condition channels layered over it. The
//! acquisition policy in [`lock`](self::lock) gives producers the
//! block-forever / try-once / bounded choice that `add` exposes.

pub mod lock;
pub mod monitor;

pub use lock::{lock_with, AcquireTimeout};
pub use monitor::{Monitor, WaitOutcome};
