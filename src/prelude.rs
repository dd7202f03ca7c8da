//! Convenient re-exports for common types and traits

pub use crate::core::{
    ClosureRunnable, ManagerError, Result, Runnable, SharedRunnable, Task, TaskState,
};
pub use crate::manager::{ExpireCallback, ManagerState, SimpleThreadManager, ThreadManager};
pub use crate::sync::{lock_with, AcquireTimeout, Monitor, WaitOutcome};
pub use crate::threading::{Thread, ThreadFactory, ThreadLifecycle};
