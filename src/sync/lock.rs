//! Timed mutex acquisition

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::time::Duration;

/// How long a caller is willing to wait for a lock (or for queue capacity).
///
/// Mirrors the millisecond convention used by [`ThreadManager::add`]: zero
/// waits forever, a negative value tries once without blocking, a positive
/// value waits that long. [`AcquireTimeout::from_millis`] performs that
/// conversion.
///
/// [`ThreadManager::add`]: crate::manager::ThreadManager::add
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireTimeout {
    /// Block until the lock is acquired
    Forever,
    /// Try once, never block
    TryOnce,
    /// Block for at most this long
    Bounded(Duration),
}

impl AcquireTimeout {
    /// Convert a signed millisecond timeout: `0` waits forever, a negative
    /// value tries once, a positive value waits that many milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            0 => AcquireTimeout::Forever,
            m if m < 0 => AcquireTimeout::TryOnce,
            m => AcquireTimeout::Bounded(Duration::from_millis(m as u64)),
        }
    }

    /// Whether this mode permits blocking at all
    pub fn may_block(&self) -> bool {
        !matches!(self, AcquireTimeout::TryOnce)
    }
}

impl fmt::Display for AcquireTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireTimeout::Forever => write!(f, "blocking"),
            AcquireTimeout::TryOnce => write!(f, "non-blocking"),
            AcquireTimeout::Bounded(d) => write!(f, "{}ms", d.as_millis()),
        }
    }
}

/// Acquire `mutex` under the given timeout policy.
///
/// Returns `None` when the lock could not be taken; callers test this before
/// entering the critical section. The returned guard releases the lock on
/// every exit path, panics included.
pub fn lock_with<T>(mutex: &Mutex<T>, timeout: AcquireTimeout) -> Option<MutexGuard<'_, T>> {
    match timeout {
        AcquireTimeout::Forever => Some(mutex.lock()),
        AcquireTimeout::TryOnce => mutex.try_lock(),
        AcquireTimeout::Bounded(wait) => mutex.try_lock_for(wait),
    }
}
