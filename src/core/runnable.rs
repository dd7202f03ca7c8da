//! Runnable trait and related types

use crate::core::error::Result;
use std::fmt;
use std::sync::Arc;

/// A trait representing a unit of work submitted to the thread manager.
///
/// Runnables are shared by reference: the same `Arc<dyn Runnable>` may be
/// submitted several times and outlives any single submission, so `run`
/// takes `&self`.
pub trait Runnable: Send + Sync {
    /// Execute the unit of work
    ///
    /// # Errors
    ///
    /// Returns an error if the work fails; the worker logs it and carries on.
    fn run(&self) -> Result<()>;

    /// Get the runnable's display name for logging
    fn name(&self) -> &str {
        "runnable"
    }
}

impl fmt::Debug for dyn Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runnable({})", self.name())
    }
}

/// A shared handle to a runnable, as stored by the manager's queue.
pub type SharedRunnable = Arc<dyn Runnable>;

/// Helper to create a runnable from a closure
pub struct ClosureRunnable<F>
where
    F: Fn() -> Result<()> + Send + Sync,
{
    closure: F,
    name: String,
}

impl<F> ClosureRunnable<F>
where
    F: Fn() -> Result<()> + Send + Sync,
{
    /// Create a new closure runnable
    pub fn new(closure: F) -> Self {
        Self {
            closure,
            name: "ClosureRunnable".to_string(),
        }
    }

    /// Create a new closure runnable with a custom name
    pub fn with_name<S: Into<String>>(closure: F, name: S) -> Self {
        Self {
            closure,
            name: name.into(),
        }
    }
}

impl<F> Runnable for ClosureRunnable<F>
where
    F: Fn() -> Result<()> + Send + Sync,
{
    fn run(&self) -> Result<()> {
        (self.closure)()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
