//! Condition channels bound to a shared mutex

use parking_lot::{Condvar, MutexGuard};
use std::time::{Duration, Instant};

/// How a wait on a [`Monitor`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The monitor was notified (or the wake was spurious)
    Notified,
    /// The timeout elapsed first
    TimedOut,
}

impl WaitOutcome {
    /// Whether the wait ended because the timeout elapsed
    pub fn timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut)
    }
}

/// One condition channel over a mutex.
///
/// Several monitors may be bound to the same mutex, in which case all
/// signalling serializes against one critical section and a shared predicate
/// is re-evaluated atomically with the notification. The binding is
/// established by use: every wait must pass a guard of the same mutex.
///
/// Spurious wakes are permitted; callers loop on a predicate.
#[derive(Debug, Default)]
pub struct Monitor {
    condvar: Condvar,
}

impl Monitor {
    /// Create a new monitor
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until notified. The caller holds the mutex through `guard`; the
    /// lock is released for the duration of the wait and reacquired before
    /// returning.
    pub fn wait<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>) {
        self.condvar.wait(guard);
    }

    /// Wait until notified or until `timeout` elapses.
    pub fn wait_for<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        timeout: Duration,
    ) -> WaitOutcome {
        if self.condvar.wait_for(guard, timeout).timed_out() {
            WaitOutcome::TimedOut
        } else {
            WaitOutcome::Notified
        }
    }

    /// Wait until notified or until the steady-clock instant `deadline`.
    pub fn wait_until<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        deadline: Instant,
    ) -> WaitOutcome {
        if self.condvar.wait_until(guard, deadline).timed_out() {
            WaitOutcome::TimedOut
        } else {
            WaitOutcome::Notified
        }
    }

    /// Wait with a millisecond timeout where `0` means wait indefinitely.
    pub fn wait_ms<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>, millis: u64) -> WaitOutcome {
        if millis == 0 {
            self.wait(guard);
            WaitOutcome::Notified
        } else {
            self.wait_for(guard, Duration::from_millis(millis))
        }
    }

    /// Wake one waiter. Issue while holding the bound mutex.
    pub fn notify_one(&self) {
        self.condvar.notify_one();
    }

    /// Wake all waiters. Issue while holding the bound mutex.
    pub fn notify_all(&self) {
        self.condvar.notify_all();
    }
}
