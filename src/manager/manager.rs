//! The thread manager: public API, task queue, worker fleet, resize
//! protocol, expiration sweeps, shutdown.

use crate::core::error::{ManagerError, Result};
use crate::core::runnable::{ClosureRunnable, SharedRunnable};
use crate::core::task::Task;
use crate::manager::worker::Worker;
use crate::sync::{lock_with, AcquireTimeout, Monitor};
use crate::threading::{Thread, ThreadFactory};
use parking_lot::{Mutex, MutexGuard};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::{Duration, Instant};

/// Lifecycle of a [`ThreadManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ManagerState {
    /// Constructed, not yet started
    Uninitialized = 0,
    /// Transient label between `Uninitialized` and `Started`
    Starting = 1,
    /// Accepting tasks and dispatching to workers
    Started = 2,
    /// Shutting down: workers drain the queue, then exit
    Joining = 3,
    /// Transient label between `Joining` and `Stopped`
    Stopping = 4,
    /// Shut down; the queue is empty and the fleet is gone
    Stopped = 5,
}

impl ManagerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ManagerState::Uninitialized,
            1 => ManagerState::Starting,
            2 => ManagerState::Started,
            3 => ManagerState::Joining,
            4 => ManagerState::Stopping,
            _ => ManagerState::Stopped,
        }
    }
}

/// Callback invoked with the runnable of every task dropped on expiration.
///
/// Called while the manager lock is held: it must not block and must not
/// call back into the manager.
pub type ExpireCallback = Box<dyn Fn(SharedRunnable) + Send + Sync>;

/// Everything a manager's workers and producers coordinate through.
///
/// `idle_count` and `state` live outside the mutex so the two lock-free
/// observability reads can see them; both are only ever written while the
/// mutex is held.
pub(crate) struct Shared {
    pub(crate) inner: Mutex<Inner>,
    /// Queue became non-empty, or a worker should re-check whether it is
    /// still needed
    pub(crate) task_monitor: Monitor,
    /// Queue length dropped below the bound
    pub(crate) capacity_monitor: Monitor,
    /// `worker_count` changed; waiters re-check against `worker_max_count`
    pub(crate) worker_monitor: Monitor,
    pub(crate) idle_count: AtomicUsize,
    state: AtomicU8,
}

impl Shared {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                tasks: VecDeque::new(),
                worker_count: 0,
                worker_max_count: 0,
                pending_task_count_max: 0,
                expired_count: 0,
                workers: HashMap::new(),
                dead_workers: Vec::new(),
                factory: None,
                expire_callback: None,
            }),
            task_monitor: Monitor::new(),
            capacity_monitor: Monitor::new(),
            worker_monitor: Monitor::new(),
            idle_count: AtomicUsize::new(0),
            state: AtomicU8::new(ManagerState::Uninitialized as u8),
        }
    }

    pub(crate) fn state(&self) -> ManagerState {
        ManagerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ManagerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

pub(crate) struct Inner {
    pub(crate) tasks: VecDeque<Task>,
    /// Threads currently inside the dispatch loop
    pub(crate) worker_count: usize,
    /// Target fleet size
    pub(crate) worker_max_count: usize,
    /// Queue bound; 0 means unbounded
    pub(crate) pending_task_count_max: usize,
    pub(crate) expired_count: usize,
    /// Live workers by OS thread id; doubles as the reentrancy index for
    /// `add`'s deadlock avoidance
    pub(crate) workers: HashMap<ThreadId, Arc<Thread>>,
    /// Exited workers awaiting reaping
    pub(crate) dead_workers: Vec<Arc<Thread>>,
    pub(crate) factory: Option<ThreadFactory>,
    pub(crate) expire_callback: Option<ExpireCallback>,
}

/// A bounded-capacity, expiration-aware worker-thread manager.
///
/// Producers [`add`](ThreadManager::add) tasks; a resizable fleet of worker
/// threads dequeues and executes them in FIFO order. An optional queue bound
/// applies backpressure (or outright rejection) to producers, optional
/// per-task deadlines drop tasks that wait too long, and shutdown joins or
/// detaches workers according to the configured [`ThreadFactory`].
///
/// One mutex protects the entire manager state; the three condition
/// channels over it serialize all signalling against one critical section,
/// so every predicate is re-evaluated atomically with its notification.
///
/// # Example
///
/// ```rust
/// use taskfleet::prelude::*;
///
/// # fn main() -> Result<()> {
/// let manager = ThreadManager::new();
/// manager.set_thread_factory(ThreadFactory::new().detached(false))?;
/// manager.start()?;
/// manager.add_worker(2)?;
///
/// for i in 0..10 {
///     manager.execute(move || {
///         println!("task {} executing", i);
///         Ok(())
///     })?;
/// }
///
/// manager.stop()?;
/// # Ok(())
/// # }
/// ```
pub struct ThreadManager {
    shared: Arc<Shared>,
}

impl ThreadManager {
    /// Create a manager with no workers, no queue bound, and no factory
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::new()),
        }
    }

    /// The configured thread factory, if any
    pub fn thread_factory(&self) -> Option<ThreadFactory> {
        self.shared.inner.lock().factory.clone()
    }

    /// Set the thread factory.
    ///
    /// Worker threads outlive this call and must be joined (or not)
    /// consistently, so replacing an existing factory requires the same
    /// detached disposition. The first factory set is unconstrained.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::FactoryMismatch`] when the replacement
    /// changes the disposition.
    pub fn set_thread_factory(&self, factory: ThreadFactory) -> Result<()> {
        let mut guard = self.shared.inner.lock();
        if let Some(existing) = guard.factory.as_ref() {
            if existing.is_detached() != factory.is_detached() {
                return Err(ManagerError::FactoryMismatch);
            }
        }
        guard.factory = Some(factory);
        Ok(())
    }

    /// Start the manager. Idempotent; a stopped manager stays stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NoThreadFactory`] when no factory has been
    /// configured.
    pub fn start(&self) -> Result<()> {
        let guard = self.shared.inner.lock();
        match self.shared.state() {
            ManagerState::Stopped => Ok(()),
            ManagerState::Uninitialized => {
                if guard.factory.is_none() {
                    return Err(ManagerError::NoThreadFactory);
                }
                self.shared.set_state(ManagerState::Started);
                self.shared.task_monitor.notify_all();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Stop the manager: drain and shut down the fleet, then drop whatever
    /// is left in the queue. Idempotent; also invoked on drop.
    ///
    /// Blocks until every worker has left the dispatch loop, so it can block
    /// for as long as the longest running task.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Join`] when a joinable worker panicked. The
    /// manager still ends up `Stopped`.
    pub fn stop(&self) -> Result<()> {
        let mut guard = self.shared.inner.lock();
        let do_stop = !matches!(
            self.shared.state(),
            ManagerState::Stopping | ManagerState::Joining | ManagerState::Stopped
        );

        let mut result = Ok(());
        if do_stop {
            self.shared.set_state(ManagerState::Joining);
            let live = guard.worker_count;
            result = Self::remove_workers_locked(&self.shared, &mut guard, live);
            guard.tasks.clear();
        }
        self.shared.set_state(ManagerState::Stopped);
        result
    }

    /// Submit a task.
    ///
    /// `timeout` governs both the lock acquisition and, for a bounded queue
    /// at capacity, how the caller waits for room: [`AcquireTimeout::Forever`]
    /// blocks until space appears, [`AcquireTimeout::Bounded`] waits in slices
    /// of that duration re-checking the queue, and [`AcquireTimeout::TryOnce`]
    /// never blocks. A worker thread of this manager is never allowed to
    /// block here, whatever its timeout: a worker sleeping on its own full
    /// queue could never be woken.
    ///
    /// With `Some(expiration)` the task must be dequeued within that span or
    /// it is dropped and reported through the expire callback.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::LockTimeout`]: the lock was not acquired in time.
    /// - [`ManagerError::IllegalState`]: the manager is not `Started`.
    /// - [`ManagerError::QueueFull`]: the queue is at capacity and the
    ///   caller is a worker of this manager or passed `TryOnce`.
    pub fn add(
        &self,
        runnable: SharedRunnable,
        timeout: AcquireTimeout,
        expiration: Option<Duration>,
    ) -> Result<()> {
        let mut guard = lock_with(&self.shared.inner, timeout)
            .ok_or_else(|| ManagerError::lock_timeout(timeout))?;

        if self.shared.state() != ManagerState::Started {
            return Err(ManagerError::illegal_state(self.shared.state()));
        }

        // At the limit, drop one expired task to see if the limit clears.
        if guard.pending_task_count_max > 0 && guard.tasks.len() >= guard.pending_task_count_max {
            Self::remove_expired(&mut guard, true);
        }

        if guard.pending_task_count_max > 0 && guard.tasks.len() >= guard.pending_task_count_max {
            let caller_is_worker = guard.workers.contains_key(&std::thread::current().id());
            if !caller_is_worker && timeout.may_block() {
                while guard.pending_task_count_max > 0
                    && guard.tasks.len() >= guard.pending_task_count_max
                {
                    match timeout {
                        AcquireTimeout::Bounded(granularity) => {
                            let _ = self.shared.capacity_monitor.wait_for(&mut guard, granularity);
                        }
                        _ => self.shared.capacity_monitor.wait(&mut guard),
                    }
                }
            } else {
                return Err(ManagerError::queue_full(
                    guard.tasks.len(),
                    guard.pending_task_count_max,
                ));
            }
        }

        guard.tasks.push_back(Task::new(runnable, expiration));

        // If an idle worker is available wake it; otherwise every worker is
        // busy and will get around to this task in time.
        if self.shared.idle_count.load(Ordering::Relaxed) > 0 {
            self.shared.task_monitor.notify_one();
        }
        Ok(())
    }

    /// Submit a closure as a task with no submission timeout and no deadline
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.add(
            Arc::new(ClosureRunnable::new(f)),
            AcquireTimeout::Forever,
            None,
        )
    }

    /// Grow the fleet by `count` workers.
    ///
    /// Raises the fleet target, starts the new threads, and blocks until
    /// every one of them has entered the dispatch loop.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NoThreadFactory`] without a factory, or
    /// [`ManagerError::Spawn`] when the OS refuses a thread (workers started
    /// before the failure are kept).
    pub fn add_worker(&self, count: usize) -> Result<()> {
        let mut guard = self.shared.inner.lock();
        let factory = guard.factory.clone().ok_or(ManagerError::NoThreadFactory)?;

        guard.worker_max_count += count;

        let mut started = 0;
        let mut spawn_error = None;
        for _ in 0..count {
            let worker = Worker::new(Arc::downgrade(&self.shared));
            let thread = factory.new_thread(Arc::new(worker));
            match thread.start() {
                Ok(()) => {
                    started += 1;
                    if let Some(id) = thread.id() {
                        guard.workers.insert(id, thread);
                    }
                }
                Err(e) => {
                    spawn_error = Some(e);
                    break;
                }
            }
        }
        if spawn_error.is_some() {
            guard.worker_max_count -= count - started;
        }

        while guard.worker_count != guard.worker_max_count {
            self.shared.worker_monitor.wait(&mut guard);
        }

        match spawn_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Shrink the fleet by `count` workers.
    ///
    /// Lowers the fleet target, wakes idle workers so they observe the new
    /// cap and exit, blocks until the fleet has shrunk to the target, and
    /// reaps exited threads (joining them when the factory is joinable).
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidWorkerCount`] when `count` exceeds the
    /// fleet target, or [`ManagerError::Join`] when a reaped worker had
    /// panicked.
    pub fn remove_worker(&self, count: usize) -> Result<()> {
        let mut guard = self.shared.inner.lock();
        Self::remove_workers_locked(&self.shared, &mut guard, count)
    }

    fn remove_workers_locked(
        shared: &Shared,
        guard: &mut MutexGuard<'_, Inner>,
        count: usize,
    ) -> Result<()> {
        if count > guard.worker_max_count {
            return Err(ManagerError::invalid_worker_count(
                count,
                guard.worker_max_count,
            ));
        }
        guard.worker_max_count -= count;

        let idle = shared.idle_count.load(Ordering::Relaxed);
        if idle > count {
            // More idle workers than we need to remove; wake just enough of
            // them to terminate.
            for _ in 0..count {
                shared.task_monitor.notify_one();
            }
        } else {
            shared.task_monitor.notify_all();
        }

        while guard.worker_count != guard.worker_max_count {
            shared.worker_monitor.wait(guard);
        }

        let dead = std::mem::take(&mut guard.dead_workers);
        for thread in dead {
            thread.join()?;
            if let Some(id) = thread.id() {
                guard.workers.remove(&id);
            }
        }
        Ok(())
    }

    /// Remove the first pending task wrapping the same runnable allocation
    /// as `runnable`. A silent no-op when no such task is queued.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::IllegalState`] unless the manager is
    /// `Started`.
    pub fn remove(&self, runnable: &SharedRunnable) -> Result<()> {
        let mut guard = self.shared.inner.lock();
        if self.shared.state() != ManagerState::Started {
            return Err(ManagerError::illegal_state(self.shared.state()));
        }
        if let Some(position) = guard.tasks.iter().position(|t| t.runnable_is(runnable)) {
            guard.tasks.remove(position);
        }
        Ok(())
    }

    /// Pop and return the runnable of the next task that would run, or
    /// `None` when the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::IllegalState`] unless the manager is
    /// `Started`.
    pub fn remove_next_pending(&self) -> Result<Option<SharedRunnable>> {
        let mut guard = self.shared.inner.lock();
        if self.shared.state() != ManagerState::Started {
            return Err(ManagerError::illegal_state(self.shared.state()));
        }
        Ok(guard.tasks.pop_front().map(|task| task.runnable()))
    }

    /// Drop every queued task whose deadline has passed, reporting each to
    /// the expire callback.
    pub fn remove_expired_tasks(&self) {
        let mut guard = self.shared.inner.lock();
        Self::remove_expired(&mut guard, false);
    }

    /// Walk the whole queue dropping expired tasks. The sweep never stops at
    /// the first unexpired entry: submissions carry arbitrary expirations,
    /// so a later task may expire before an earlier one.
    pub(crate) fn remove_expired(inner: &mut Inner, just_one: bool) {
        if inner.tasks.is_empty() {
            return;
        }
        let now = Instant::now();
        let mut index = 0;
        while index < inner.tasks.len() {
            if inner.tasks[index].expired_by(now) {
                if let Some(task) = inner.tasks.remove(index) {
                    if let Some(callback) = inner.expire_callback.as_ref() {
                        callback(task.runnable());
                    }
                    inner.expired_count += 1;
                    if just_one {
                        return;
                    }
                }
            } else {
                index += 1;
            }
        }
    }

    /// Set the callback invoked with each task dropped on expiration.
    ///
    /// The callback runs under the manager lock: it must not block and must
    /// not call back into the manager.
    pub fn set_expire_callback<F>(&self, callback: F)
    where
        F: Fn(SharedRunnable) + Send + Sync + 'static,
    {
        self.shared.inner.lock().expire_callback = Some(Box::new(callback));
    }

    /// Remove the expire callback
    pub fn clear_expire_callback(&self) {
        self.shared.inner.lock().expire_callback = None;
    }

    /// Set the queue bound; 0 means unbounded. Intended before `start`:
    /// the bound is fixed for the manager's life once tasks are flowing.
    pub fn set_pending_task_count_max(&self, value: usize) {
        self.shared.inner.lock().pending_task_count_max = value;
    }

    /// Number of workers currently blocked waiting for a task.
    ///
    /// Read without the lock: best-effort, may be momentarily stale.
    pub fn idle_worker_count(&self) -> usize {
        self.shared.idle_count.load(Ordering::Relaxed)
    }

    /// Current manager state.
    ///
    /// Read without the lock: best-effort, may be momentarily stale.
    pub fn state(&self) -> ManagerState {
        self.shared.state()
    }

    /// Number of threads currently inside the dispatch loop
    pub fn worker_count(&self) -> usize {
        self.shared.inner.lock().worker_count
    }

    /// Number of queued tasks
    pub fn pending_task_count(&self) -> usize {
        self.shared.inner.lock().tasks.len()
    }

    /// Number of queued plus executing tasks
    pub fn total_task_count(&self) -> usize {
        let guard = self.shared.inner.lock();
        guard.tasks.len() + guard.worker_count - self.shared.idle_count.load(Ordering::Relaxed)
    }

    /// The queue bound; 0 means unbounded
    pub fn pending_task_count_max(&self) -> usize {
        self.shared.inner.lock().pending_task_count_max
    }

    /// Number of tasks dropped on expiration since the manager was created
    pub fn expired_task_count(&self) -> usize {
        self.shared.inner.lock().expired_count
    }
}

impl Default for ThreadManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadManager {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %e, "failed to stop thread manager during drop");
            #[cfg(not(feature = "tracing"))]
            eprintln!(
                "[THREAD_MANAGER ERROR] failed to stop thread manager during drop: {}",
                e
            );
        }
    }
}

impl fmt::Debug for ThreadManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.shared.inner.lock();
        f.debug_struct("ThreadManager")
            .field("state", &self.shared.state())
            .field("worker_count", &guard.worker_count)
            .field("worker_max_count", &guard.worker_max_count)
            .field("pending_task_count", &guard.tasks.len())
            .field("pending_task_count_max", &guard.pending_task_count_max)
            .field("expired_count", &guard.expired_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn tagged(tag: usize, log: &Arc<Mutex<Vec<usize>>>) -> SharedRunnable {
        let log = Arc::clone(log);
        Arc::new(ClosureRunnable::new(move || {
            log.lock().push(tag);
            Ok(())
        }))
    }

    fn noop() -> SharedRunnable {
        Arc::new(ClosureRunnable::new(|| Ok(())))
    }

    #[test]
    fn test_fresh_manager() {
        let manager = ThreadManager::new();
        assert_eq!(manager.state(), ManagerState::Uninitialized);
        assert_eq!(manager.worker_count(), 0);
        assert_eq!(manager.idle_worker_count(), 0);
        assert_eq!(manager.pending_task_count(), 0);
        assert_eq!(manager.pending_task_count_max(), 0);
        assert_eq!(manager.expired_task_count(), 0);
        assert!(manager.thread_factory().is_none());
    }

    #[test]
    fn test_start_requires_factory() {
        let manager = ThreadManager::new();
        assert!(matches!(
            manager.start(),
            Err(ManagerError::NoThreadFactory)
        ));
    }

    #[test]
    fn test_add_requires_started() {
        let manager = ThreadManager::new();
        let result = manager.add(noop(), AcquireTimeout::Forever, None);
        assert!(matches!(result, Err(ManagerError::IllegalState { .. })));
    }

    #[test]
    fn test_start_is_idempotent() {
        let manager = ThreadManager::new();
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("set factory failed");
        manager.start().expect("first start failed");
        manager.start().expect("second start failed");
        assert_eq!(manager.state(), ManagerState::Started);
    }

    #[test]
    fn test_stop_is_idempotent_and_final() {
        let manager = ThreadManager::new();
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("set factory failed");
        manager.start().expect("start failed");
        manager.execute(|| Ok(())).expect("add failed");

        manager.stop().expect("first stop failed");
        manager.stop().expect("second stop failed");

        assert_eq!(manager.state(), ManagerState::Stopped);
        assert_eq!(manager.worker_count(), 0);
        assert_eq!(manager.pending_task_count(), 0);

        // A stopped manager stays stopped
        manager.start().expect("start on stopped manager failed");
        assert_eq!(manager.state(), ManagerState::Stopped);
    }

    #[test]
    fn test_factory_exchange_disposition() {
        let manager = ThreadManager::new();
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("first factory rejected");

        // Same disposition may replace
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("same-disposition replacement rejected");

        // Changed disposition may not
        let result = manager.set_thread_factory(ThreadFactory::new());
        assert!(matches!(result, Err(ManagerError::FactoryMismatch)));
    }

    #[test]
    fn test_add_then_remove_next_pending_round_trips() {
        let manager = ThreadManager::new();
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("set factory failed");
        manager.start().expect("start failed");

        let runnable = noop();
        manager
            .add(SharedRunnable::clone(&runnable), AcquireTimeout::Forever, None)
            .expect("add failed");

        let popped = manager
            .remove_next_pending()
            .expect("remove_next_pending failed")
            .expect("queue was empty");
        assert!(SharedRunnable::ptr_eq(&popped, &runnable));
        assert!(manager
            .remove_next_pending()
            .expect("remove_next_pending failed")
            .is_none());
    }

    #[test]
    fn test_remove_specific_runnable() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = ThreadManager::new();
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("set factory failed");
        manager.start().expect("start failed");

        let keep = tagged(1, &log);
        let target = tagged(2, &log);
        manager
            .add(SharedRunnable::clone(&keep), AcquireTimeout::Forever, None)
            .expect("add failed");
        manager
            .add(SharedRunnable::clone(&target), AcquireTimeout::Forever, None)
            .expect("add failed");

        manager.remove(&target).expect("remove failed");
        assert_eq!(manager.pending_task_count(), 1);

        // Removing an absent runnable is a silent no-op
        manager.remove(&target).expect("second remove failed");
        assert_eq!(manager.pending_task_count(), 1);

        let popped = manager
            .remove_next_pending()
            .expect("remove_next_pending failed")
            .expect("queue was empty");
        assert!(SharedRunnable::ptr_eq(&popped, &keep));
    }

    #[test]
    fn test_bounded_queue_rejects_try_once() {
        let manager = ThreadManager::new();
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("set factory failed");
        manager.set_pending_task_count_max(2);
        manager.start().expect("start failed");

        manager
            .add(noop(), AcquireTimeout::TryOnce, None)
            .expect("first add failed");
        manager
            .add(noop(), AcquireTimeout::TryOnce, None)
            .expect("second add failed");

        let result = manager.add(noop(), AcquireTimeout::TryOnce, None);
        assert!(matches!(
            result,
            Err(ManagerError::QueueFull { pending: 2, max: 2 })
        ));
    }

    #[test]
    fn test_full_queue_admits_after_expiry_sweep() {
        let manager = ThreadManager::new();
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("set factory failed");
        manager.set_pending_task_count_max(1);
        manager.start().expect("start failed");

        manager
            .add(
                noop(),
                AcquireTimeout::TryOnce,
                Some(Duration::from_millis(10)),
            )
            .expect("first add failed");

        std::thread::sleep(Duration::from_millis(50));

        // The queue is nominally full, but the expired occupant is swept out
        manager
            .add(noop(), AcquireTimeout::TryOnce, None)
            .expect("add after expiry failed");
        assert_eq!(manager.expired_task_count(), 1);
        assert_eq!(manager.pending_task_count(), 1);
    }

    #[test]
    fn test_expiration_sweep_traverses_whole_queue() {
        let manager = ThreadManager::new();
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("set factory failed");
        manager.start().expect("start failed");

        // Earlier task outlives a later one: the sweep must not stop at the
        // first unexpired entry.
        manager
            .add(noop(), AcquireTimeout::Forever, Some(Duration::from_secs(3600)))
            .expect("long add failed");
        manager
            .add(noop(), AcquireTimeout::Forever, Some(Duration::from_millis(10)))
            .expect("short add failed");
        manager
            .add(noop(), AcquireTimeout::Forever, None)
            .expect("undying add failed");

        std::thread::sleep(Duration::from_millis(50));
        manager.remove_expired_tasks();

        assert_eq!(manager.expired_task_count(), 1);
        assert_eq!(manager.pending_task_count(), 2);
    }

    #[test]
    fn test_expire_callback_receives_runnable() {
        let received = Arc::new(AtomicUsize::new(0));
        let received_clone = Arc::clone(&received);

        let manager = ThreadManager::new();
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("set factory failed");
        manager.set_expire_callback(move |_| {
            received_clone.fetch_add(1, Ordering::SeqCst);
        });
        manager.start().expect("start failed");

        manager
            .add(
                noop(),
                AcquireTimeout::Forever,
                Some(Duration::from_millis(10)),
            )
            .expect("add failed");
        std::thread::sleep(Duration::from_millis(50));
        manager.remove_expired_tasks();

        assert_eq!(received.load(Ordering::SeqCst), 1);
        assert_eq!(manager.expired_task_count(), 1);

        manager.clear_expire_callback();
        manager
            .add(
                noop(),
                AcquireTimeout::Forever,
                Some(Duration::from_millis(10)),
            )
            .expect("add failed");
        std::thread::sleep(Duration::from_millis(50));
        manager.remove_expired_tasks();

        // Sweeps count expirations even without a callback
        assert_eq!(received.load(Ordering::SeqCst), 1);
        assert_eq!(manager.expired_task_count(), 2);
    }

    #[test]
    fn test_total_task_count_without_workers() {
        let manager = ThreadManager::new();
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("set factory failed");
        manager.start().expect("start failed");

        for _ in 0..3 {
            manager.execute(|| Ok(())).expect("add failed");
        }
        assert_eq!(manager.pending_task_count(), 3);
        assert_eq!(manager.total_task_count(), 3);
    }

    #[test]
    fn test_remove_worker_beyond_target_fails() {
        let manager = ThreadManager::new();
        manager
            .set_thread_factory(ThreadFactory::new().detached(false))
            .expect("set factory failed");
        manager.start().expect("start failed");

        let result = manager.remove_worker(1);
        assert!(matches!(
            result,
            Err(ManagerError::InvalidWorkerCount {
                requested: 1,
                target: 0
            })
        ));
    }
}
