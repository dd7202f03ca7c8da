//! Factory for worker threads

use crate::core::runnable::SharedRunnable;
use crate::threading::Thread;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Creates [`Thread`]s bound to runnables, fixing a single
/// detached-vs-joinable disposition for every thread it produces.
///
/// By default threads are detached. Clones share the thread-numbering
/// counter, so names stay unique across clones.
#[derive(Debug, Clone)]
pub struct ThreadFactory {
    detached: bool,
    name_prefix: String,
    counter: Arc<AtomicUsize>,
}

impl ThreadFactory {
    /// Create a factory producing detached threads named `worker-N`
    pub fn new() -> Self {
        Self {
            detached: true,
            name_prefix: "worker".to_string(),
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the detached disposition of newly created threads
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn detached(mut self, detached: bool) -> Self {
        self.detached = detached;
        self
    }

    /// Set the thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Current detached disposition
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Create a new thread bound to `runnable`, ready to start
    pub fn new_thread(&self, runnable: SharedRunnable) -> Arc<Thread> {
        let name = format!(
            "{}-{}",
            self.name_prefix,
            self.counter.fetch_add(1, Ordering::Relaxed)
        );
        Arc::new(Thread::new(self.detached, name, runnable))
    }
}

impl Default for ThreadFactory {
    fn default() -> Self {
        Self::new()
    }
}
