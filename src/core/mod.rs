//! Core types and traits for the thread manager

pub mod error;
pub mod runnable;
pub mod task;

pub use error::{ManagerError, Result};
pub use runnable::{ClosureRunnable, Runnable, SharedRunnable};
pub use task::{Task, TaskState};
