//! The per-thread dispatch state machine

use crate::core::error::Result;
use crate::core::runnable::Runnable;
use crate::core::task::{Task, TaskState};
use crate::manager::manager::{Inner, ManagerState, Shared};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::{debug, span, Level};

/// The runnable each worker thread executes: admit, fetch, execute,
/// account, exit.
///
/// Holds only a weak edge back to the manager state: the manager owns its
/// worker threads, each thread owns its worker runnable, and a strong edge
/// here would close an ownership cycle that kept the manager alive forever.
pub(crate) struct Worker {
    shared: Weak<Shared>,
}

impl Worker {
    pub(crate) fn new(shared: Weak<Shared>) -> Self {
        Self { shared }
    }

    /// Whether this worker should stay in the dispatch loop: either the
    /// fleet is within its quota, or the manager is draining its queue on
    /// the way down. Re-evaluated after every wait, since both the quota
    /// and the manager state may have changed.
    fn is_active(shared: &Shared, inner: &Inner) -> bool {
        inner.worker_count <= inner.worker_max_count
            || (shared.state() == ManagerState::Joining && !inner.tasks.is_empty())
    }
}

impl Runnable for Worker {
    fn run(&self) -> Result<()> {
        let Some(shared) = self.shared.upgrade() else {
            return Ok(());
        };

        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "worker");
        #[cfg(feature = "tracing")]
        let _span_guard = worker_span.enter();

        let mut guard = shared.inner.lock();

        // Admission: join the fleet if it is still below target, and tell
        // resize waiters when the target is reached. A worker that arrives
        // over target is surplus and goes straight to the exit.
        let admitted = guard.worker_count < guard.worker_max_count;
        if admitted {
            guard.worker_count += 1;
            if guard.worker_count == guard.worker_max_count {
                shared.worker_monitor.notify_one();
            }
            #[cfg(feature = "tracing")]
            debug!(fleet = guard.worker_count, "worker admitted");
        }

        let mut active = admitted;
        while active {
            active = Self::is_active(&shared, &guard);

            while active && guard.tasks.is_empty() {
                shared.idle_count.fetch_add(1, Ordering::Relaxed);
                shared.task_monitor.wait(&mut guard);
                active = Self::is_active(&shared, &guard);
                shared.idle_count.fetch_sub(1, Ordering::Relaxed);
            }

            let mut task = None;
            if active {
                if let Some(mut claimed) = guard.tasks.pop_front() {
                    // The dequeue decides the task's fate exactly once.
                    if claimed.state() == TaskState::Waiting {
                        if claimed.expired_by(Instant::now()) {
                            claimed.mark_timed_out();
                        } else {
                            claimed.mark_executing();
                        }
                    }
                    task = Some(claimed);
                }

                // Just dropped below the bound: wake a producer blocked on add.
                if guard.pending_task_count_max != 0
                    && guard.tasks.len() <= guard.pending_task_count_max - 1
                {
                    shared.capacity_monitor.notify_one();
                }
            }

            if let Some(mut task) = task {
                if task.state() == TaskState::Executing {
                    // Run without the lock so the manager stays responsive.
                    drop(guard);
                    execute_task(&mut task);
                    guard = shared.inner.lock();
                } else if task.state() == TaskState::TimedOut {
                    if let Some(callback) = guard.expire_callback.as_ref() {
                        callback(task.runnable());
                        guard.expired_count += 1;
                    }
                }
            }
        }

        // Exit: report for reaping; admitted workers also leave the fleet
        // accounting and tell resize waiters when the target is reached.
        let current = std::thread::current().id();
        let me = guard.workers.get(&current).map(Arc::clone);
        if let Some(me) = me {
            guard.dead_workers.push(me);
        }
        if admitted {
            guard.worker_count -= 1;
            if guard.worker_count == guard.worker_max_count {
                shared.worker_monitor.notify_one();
            }
        }

        #[cfg(feature = "tracing")]
        debug!(fleet = guard.worker_count, "worker exiting");

        Ok(())
    }

    fn name(&self) -> &str {
        "worker"
    }
}

/// Execute a claimed task, containing errors and panics: neither may reach
/// the dispatch loop or the manager.
fn execute_task(task: &mut Task) {
    let start = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| task.run()));
    let elapsed = start.elapsed();

    match outcome {
        Ok(Ok(())) => {
            #[cfg(feature = "tracing")]
            debug!(duration_ms = elapsed.as_millis() as u64, "task completed");
        }
        Ok(Err(e)) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                error = %e,
                duration_ms = elapsed.as_millis() as u64,
                "task failed"
            );
            #[cfg(not(feature = "tracing"))]
            eprintln!(
                "worker: task failed after {}ms: {}",
                elapsed.as_millis(),
                e
            );
        }
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            #[cfg(feature = "tracing")]
            tracing::error!(
                panic_message = %panic_msg,
                duration_ms = elapsed.as_millis() as u64,
                "task panicked"
            );
            #[cfg(not(feature = "tracing"))]
            eprintln!(
                "worker: task panicked after {}ms: {}",
                elapsed.as_millis(),
                panic_msg
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runnable::{ClosureRunnable, SharedRunnable};
    use crate::core::ManagerError;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_execute_task_completes() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let runnable: SharedRunnable = Arc::new(ClosureRunnable::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let mut task = Task::new(runnable, None);
        task.mark_executing();
        execute_task(&mut task);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(task.state(), TaskState::Complete);
    }

    #[test]
    fn test_execute_task_contains_errors() {
        let runnable: SharedRunnable = Arc::new(ClosureRunnable::new(|| {
            Err(ManagerError::other("deliberate failure"))
        }));

        let mut task = Task::new(runnable, None);
        task.mark_executing();
        execute_task(&mut task);

        // The error is contained; the task never reached Complete
        assert_eq!(task.state(), TaskState::Executing);
    }

    #[test]
    fn test_execute_task_contains_panics() {
        let runnable: SharedRunnable = Arc::new(ClosureRunnable::new(|| {
            panic!("deliberate panic for testing");
        }));

        let mut task = Task::new(runnable, None);
        task.mark_executing();
        execute_task(&mut task);

        assert_eq!(task.state(), TaskState::Executing);
    }

    #[test]
    fn test_execute_task_skips_timed_out() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let runnable: SharedRunnable = Arc::new(ClosureRunnable::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let mut task = Task::new(runnable, Some(std::time::Duration::from_millis(1)));
        task.mark_timed_out();
        execute_task(&mut task);

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(task.state(), TaskState::TimedOut);
    }
}
