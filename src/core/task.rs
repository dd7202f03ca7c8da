//! Task records owned by the manager's queue

use crate::core::error::Result;
use crate::core::runnable::SharedRunnable;
use std::time::{Duration, Instant};

/// Lifecycle of a queued task.
///
/// A task transitions `Waiting` to `Executing` or `Waiting` to `TimedOut`
/// exactly once, at dequeue time, and `Executing` to `Complete` when the
/// runnable finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Queued, not yet claimed by a worker
    Waiting,
    /// Claimed by a worker and eligible to run
    Executing,
    /// Claimed past its deadline; will never run
    TimedOut,
    /// The runnable ran to completion
    Complete,
}

/// A runnable paired with an optional deadline, owned by the task queue
/// until dispatched or dropped.
#[derive(Debug)]
pub struct Task {
    runnable: SharedRunnable,
    deadline: Option<Instant>,
    state: TaskState,
}

impl Task {
    /// Create a task for `runnable`.
    ///
    /// With `Some(expiration)` the task must be dequeued within that span of
    /// its submission or it is dropped; `None` means the task never expires.
    pub fn new(runnable: SharedRunnable, expiration: Option<Duration>) -> Self {
        Self {
            runnable,
            deadline: expiration.map(|e| Instant::now() + e),
            state: TaskState::Waiting,
        }
    }

    /// Current task state
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// The task's deadline, if one was set
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// A fresh handle to the underlying runnable
    pub fn runnable(&self) -> SharedRunnable {
        SharedRunnable::clone(&self.runnable)
    }

    /// Whether the task's deadline lies before `now`
    pub fn expired_by(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline < now)
    }

    /// Whether this task wraps the same runnable allocation as `other`
    pub(crate) fn runnable_is(&self, other: &SharedRunnable) -> bool {
        SharedRunnable::ptr_eq(&self.runnable, other)
    }

    pub(crate) fn mark_executing(&mut self) {
        debug_assert_eq!(self.state, TaskState::Waiting);
        self.state = TaskState::Executing;
    }

    pub(crate) fn mark_timed_out(&mut self) {
        debug_assert_eq!(self.state, TaskState::Waiting);
        self.state = TaskState::TimedOut;
    }

    /// Run the underlying runnable.
    ///
    /// A no-op unless the task is `Executing`, so a task claimed as
    /// `TimedOut` will not execute even if dispatch were attempted.
    ///
    /// # Errors
    ///
    /// Propagates the runnable's error; the state stays `Executing` in that
    /// case.
    pub fn run(&mut self) -> Result<()> {
        if self.state == TaskState::Executing {
            self.runnable.run()?;
            self.state = TaskState::Complete;
        }
        Ok(())
    }
}
