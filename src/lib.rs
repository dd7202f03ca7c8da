//! # taskfleet
//!
//! A bounded-capacity, expiration-aware worker-thread manager.
//!
//! Producers submit shared runnables to a [`ThreadManager`]; a fixed but
//! dynamically-resizable fleet of worker threads dequeues and executes them
//! in FIFO order. The manager enforces an optional bound on queued tasks
//! (applying backpressure or outright rejection to producers), optional
//! per-task deadlines (tasks that wait past their deadline are dropped and
//! reported through a callback), and graceful shutdown that joins or
//! detaches workers according to the configured [`ThreadFactory`].
//!
//! ## Features
//!
//! - **Resizable fleet**: [`add_worker`]/[`remove_worker`] block until the
//!   fleet reaches its new size
//! - **Backpressure**: a queue bound with block-forever, bounded-wait, or
//!   try-once submission; workers of the pool are never allowed to block on
//!   their own full queue
//! - **Expiration**: per-task deadlines on a steady clock, swept on enqueue
//!   pressure and at dequeue, reported through an expire callback
//! - **Containment**: task errors and panics are logged and never reach the
//!   dispatch loop
//!
//! ## Quick Start
//!
//! ```rust
//! use taskfleet::prelude::*;
//!
//! # fn main() -> Result<()> {
//! // Four workers, at most 100 queued tasks
//! let manager = SimpleThreadManager::new(4, 100);
//! manager.start()?;
//!
//! for i in 0..10 {
//!     manager.execute(move || {
//!         println!("task {} executing", i);
//!         Ok(())
//!     })?;
//! }
//!
//! manager.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Deadlines and backpressure
//!
//! ```rust
//! use taskfleet::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let manager = ThreadManager::new();
//! manager.set_thread_factory(ThreadFactory::new().detached(false))?;
//! manager.set_pending_task_count_max(2);
//! manager.set_expire_callback(|runnable| {
//!     eprintln!("dropped before running: {}", runnable.name());
//! });
//! manager.start()?;
//!
//! // Must be dequeued within 50ms of submission or it is dropped
//! let task = Arc::new(ClosureRunnable::new(|| Ok(())));
//! manager.add(task, AcquireTimeout::TryOnce, Some(Duration::from_millis(50)))?;
//!
//! manager.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`add_worker`]: ThreadManager::add_worker
//! [`remove_worker`]: ThreadManager::remove_worker

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod manager;
pub mod prelude;
pub mod sync;
pub mod threading;

pub use crate::core::{ClosureRunnable, ManagerError, Result, Runnable, SharedRunnable, TaskState};
pub use crate::manager::{ExpireCallback, ManagerState, SimpleThreadManager, ThreadManager};
pub use crate::sync::{AcquireTimeout, Monitor, WaitOutcome};
pub use crate::threading::{Thread, ThreadFactory, ThreadLifecycle};
