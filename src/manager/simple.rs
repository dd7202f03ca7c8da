//! Convenience preset over [`ThreadManager`]

use crate::core::error::Result;
use crate::manager::ThreadManager;
use crate::threading::ThreadFactory;
use std::ops::Deref;

/// A preset manager with a fixed worker count and queue bound.
///
/// On [`start`](SimpleThreadManager::start) it sets the queue bound, starts
/// the base manager, and adds the workers, installing a default detached
/// [`ThreadFactory`] when none was configured, so the preset works out of
/// the box. Every other operation derefs to [`ThreadManager`].
///
/// # Example
///
/// ```rust
/// use taskfleet::prelude::*;
///
/// # fn main() -> Result<()> {
/// let manager = SimpleThreadManager::new(2, 16);
/// manager.start()?;
/// manager.execute(|| Ok(()))?;
/// manager.stop()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SimpleThreadManager {
    manager: ThreadManager,
    worker_count: usize,
    pending_task_count_max: usize,
}

impl SimpleThreadManager {
    /// Create a preset with `worker_count` workers (0 resolves to the number
    /// of CPUs) and a queue bound of `pending_task_count_max` (0 means
    /// unbounded).
    pub fn new(worker_count: usize, pending_task_count_max: usize) -> Self {
        Self {
            manager: ThreadManager::new(),
            worker_count: if worker_count == 0 {
                num_cpus::get()
            } else {
                worker_count
            },
            pending_task_count_max,
        }
    }

    /// Start the manager and bring the fleet up to the configured size.
    ///
    /// # Errors
    ///
    /// Propagates [`ThreadManager::start`] and [`ThreadManager::add_worker`]
    /// failures.
    pub fn start(&self) -> Result<()> {
        if self.manager.thread_factory().is_none() {
            self.manager.set_thread_factory(ThreadFactory::new())?;
        }
        self.manager
            .set_pending_task_count_max(self.pending_task_count_max);
        self.manager.start()?;
        self.manager.add_worker(self.worker_count)
    }
}

impl Default for SimpleThreadManager {
    /// Four workers, unbounded queue
    fn default() -> Self {
        Self::new(4, 0)
    }
}

impl Deref for SimpleThreadManager {
    type Target = ThreadManager;

    fn deref(&self) -> &ThreadManager {
        &self.manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ManagerState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_start_brings_up_fleet() {
        let manager = SimpleThreadManager::new(3, 0);
        manager.start().expect("start failed");

        assert_eq!(manager.state(), ManagerState::Started);
        assert_eq!(manager.worker_count(), 3);
        assert_eq!(manager.pending_task_count_max(), 0);

        manager.stop().expect("stop failed");
        assert_eq!(manager.worker_count(), 0);
    }

    #[test]
    fn test_bound_is_applied() {
        let manager = SimpleThreadManager::new(1, 8);
        manager.start().expect("start failed");
        assert_eq!(manager.pending_task_count_max(), 8);
        manager.stop().expect("stop failed");
    }

    #[test]
    fn test_zero_workers_resolves_to_cpus() {
        let manager = SimpleThreadManager::new(0, 0);
        manager.start().expect("start failed");
        assert_eq!(manager.worker_count(), num_cpus::get());
        manager.stop().expect("stop failed");
    }

    #[test]
    fn test_configured_factory_is_kept() {
        let manager = SimpleThreadManager::new(1, 0);
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("set factory failed");
        manager.start().expect("start failed");

        let factory = manager.thread_factory().expect("factory missing");
        assert!(!factory.is_detached());
        manager.stop().expect("stop failed");
    }

    #[test]
    fn test_executes_submitted_work() {
        let manager = SimpleThreadManager::new(2, 0);
        manager.start().expect("start failed");

        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            manager
                .execute(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .expect("execute failed");
        }

        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) == 10 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 10);

        manager.stop().expect("stop failed");
    }
}
