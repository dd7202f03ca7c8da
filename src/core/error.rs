//! Error types for the thread manager

use crate::manager::ManagerState;
use crate::sync::AcquireTimeout;

/// Result type for thread manager operations
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Errors that can occur in the thread manager
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ManagerError {
    /// The manager lock was not acquired within the caller's timeout
    #[error("manager lock not acquired ({mode} acquisition)")]
    LockTimeout {
        /// Acquisition mode the caller requested
        mode: AcquireTimeout,
    },

    /// Operation requires a started manager
    #[error("thread manager is {actual:?}, operation requires Started")]
    IllegalState {
        /// State the manager was actually in
        actual: ManagerState,
    },

    /// `start` or `add_worker` was called with no thread factory configured
    #[error("no thread factory configured")]
    NoThreadFactory,

    /// The task queue is at capacity and the caller may not block
    #[error("task queue is full: {pending}/{max} tasks queued")]
    QueueFull {
        /// Current queue length
        pending: usize,
        /// Configured queue bound
        max: usize,
    },

    /// `remove_worker` asked for more workers than the fleet target holds
    #[error("cannot remove {requested} workers, fleet target is {target}")]
    InvalidWorkerCount {
        /// Number of workers the caller asked to remove
        requested: usize,
        /// Current fleet target
        target: usize,
    },

    /// A replacement thread factory changes the detached disposition
    #[error("replacement thread factory must keep the current detached disposition")]
    FactoryMismatch,

    /// Failed to spawn a worker thread
    #[error("failed to spawn thread '{name}': {source}")]
    Spawn {
        /// Name of the thread that failed to spawn
        name: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked before it could be joined
    #[error("thread '{name}' panicked before joining")]
    Join {
        /// Name of the thread that failed to join
        name: String,
    },

    /// General error, available for callers' own runnables
    #[error("{0}")]
    Other(String),
}

impl ManagerError {
    /// Create a lock timeout error
    pub fn lock_timeout(mode: AcquireTimeout) -> Self {
        ManagerError::LockTimeout { mode }
    }

    /// Create an illegal state error
    pub fn illegal_state(actual: ManagerState) -> Self {
        ManagerError::IllegalState { actual }
    }

    /// Create a queue full error
    pub fn queue_full(pending: usize, max: usize) -> Self {
        ManagerError::QueueFull { pending, max }
    }

    /// Create an invalid worker count error
    pub fn invalid_worker_count(requested: usize, target: usize) -> Self {
        ManagerError::InvalidWorkerCount { requested, target }
    }

    /// Create a spawn error
    pub fn spawn(name: impl Into<String>, source: std::io::Error) -> Self {
        ManagerError::Spawn {
            name: name.into(),
            source,
        }
    }

    /// Create a join error
    pub fn join(name: impl Into<String>) -> Self {
        ManagerError::Join { name: name.into() }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        ManagerError::Other(msg.into())
    }
}
