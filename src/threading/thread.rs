//! OS thread wrapper with a start handshake

use crate::core::error::{ManagerError, Result};
use crate::core::runnable::SharedRunnable;
use crate::sync::Monitor;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{Builder, JoinHandle, ThreadId};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Lifecycle of a [`Thread`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadLifecycle {
    /// Constructed, `start` not yet called
    Uninitialized,
    /// `start` called, OS thread not yet running
    Starting,
    /// The OS thread is running the bound runnable
    Started,
    /// The runnable returned; the OS thread is winding down
    Stopping,
    /// Joined
    Stopped,
}

struct ThreadCore {
    inner: Mutex<ThreadInner>,
    monitor: Monitor,
}

struct ThreadInner {
    lifecycle: ThreadLifecycle,
    handle: Option<JoinHandle<()>>,
    id: Option<ThreadId>,
}

/// Owns one OS thread bound to exactly one runnable.
///
/// `start` spawns the OS thread and then blocks until the spawned thread has
/// recorded its id and reached [`ThreadLifecycle::Started`], set just
/// before the runnable runs. The handshake guarantees the spawned thread has
/// captured everything it needs from the caller's context before `start`
/// returns, which matters for detached callers that immediately drop their
/// last strong reference to the runnable.
///
/// Detached threads abandon their [`JoinHandle`] at start; joinable threads
/// are joined on [`join`](Thread::join) or on drop (which swallows a join
/// failure).
pub struct Thread {
    core: Arc<ThreadCore>,
    runnable: SharedRunnable,
    name: String,
    detached: bool,
}

impl Thread {
    pub(crate) fn new(detached: bool, name: String, runnable: SharedRunnable) -> Self {
        Self {
            core: Arc::new(ThreadCore {
                inner: Mutex::new(ThreadInner {
                    lifecycle: ThreadLifecycle::Uninitialized,
                    handle: None,
                    id: None,
                }),
                monitor: Monitor::new(),
            }),
            runnable,
            name,
            detached,
        }
    }

    /// Start the thread. A no-op once the thread has left
    /// [`ThreadLifecycle::Uninitialized`].
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Spawn`] when the OS refuses the thread.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.core.inner.lock();
        if inner.lifecycle != ThreadLifecycle::Uninitialized {
            return Ok(());
        }
        inner.lifecycle = ThreadLifecycle::Starting;

        let core = Arc::clone(&self.core);
        let runnable = SharedRunnable::clone(&self.runnable);
        let spawned = Builder::new().name(self.name.clone()).spawn(move || {
            {
                let mut inner = core.inner.lock();
                inner.id = Some(std::thread::current().id());
                inner.lifecycle = ThreadLifecycle::Started;
                core.monitor.notify_all();
            }

            if let Err(e) = runnable.run() {
                #[cfg(feature = "tracing")]
                warn!(error = %e, "runnable returned an error");
                #[cfg(not(feature = "tracing"))]
                eprintln!("thread runnable returned an error: {}", e);
            }

            let mut inner = core.inner.lock();
            if inner.lifecycle != ThreadLifecycle::Stopping
                && inner.lifecycle != ThreadLifecycle::Stopped
            {
                inner.lifecycle = ThreadLifecycle::Stopping;
            }
        });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                inner.lifecycle = ThreadLifecycle::Uninitialized;
                return Err(ManagerError::spawn(&self.name, e));
            }
        };

        if self.detached {
            drop(handle);
        } else {
            inner.handle = Some(handle);
        }

        // Handshake: wait for the spawned thread to publish Started.
        while inner.lifecycle == ThreadLifecycle::Starting {
            self.core.monitor.wait(&mut inner);
        }

        #[cfg(feature = "tracing")]
        debug!(name = %self.name, detached = self.detached, "thread started");

        Ok(())
    }

    /// Join the thread. The calling thread blocks until this thread
    /// completes; a no-op for detached threads.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Join`] when the thread panicked.
    pub fn join(&self) -> Result<()> {
        if self.detached {
            return Ok(());
        }
        let handle = self.core.inner.lock().handle.take();
        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| ManagerError::join(&self.name))?;
            self.core.inner.lock().lifecycle = ThreadLifecycle::Stopped;
        }
        Ok(())
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> ThreadLifecycle {
        self.core.inner.lock().lifecycle
    }

    /// The OS thread id, available once the start handshake completed
    pub fn id(&self) -> Option<ThreadId> {
        self.core.inner.lock().id
    }

    /// The thread's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this thread was abandoned at start rather than joined at
    /// teardown
    pub fn is_detached(&self) -> bool {
        self.detached
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if self.detached {
            return;
        }
        let handle = self.core.inner.lock().handle.take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.name)
            .field("detached", &self.detached)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}
