//! Worker pool for asynchronous output consumption.
//!
//! One pool is created when a build pipeline starts and shut down when it
//! ends. Every invocation in the build schedules its stream readers on it.
//! Jobs run on the runtime's blocking pool, which grows on demand, so a
//! reader waiting for a slow process can never starve another reader.

use crate::error::{BuildError, Result};
use log::debug;
use std::time::Duration;

/// Grace period for in-flight readers at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// An explicitly owned pool of worker threads.
#[derive(Debug)]
pub struct WorkerPool {
    runtime: tokio::runtime::Runtime,
}

/// Cheap, cloneable handle used to schedule work on a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct PoolHandle {
    handle: tokio::runtime::Handle,
}

impl WorkerPool {
    /// Start a pool whose threads are named `elide-worker`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Pool`] when the threads cannot be spawned.
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("elide-worker")
            .build()
            .map_err(BuildError::Pool)?;
        debug!(target: "elide", "worker pool started");
        Ok(Self { runtime })
    }

    /// Handle for scheduling jobs.
    #[must_use]
    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            handle: self.runtime.handle().clone(),
        }
    }

    /// Stop the pool, giving running jobs a short grace period.
    pub fn shutdown(self) {
        self.runtime.shutdown_timeout(SHUTDOWN_GRACE);
        debug!(target: "elide", "worker pool shut down");
    }
}

impl PoolHandle {
    /// Run `job` on the pool without waiting for it.
    ///
    /// Jobs submitted after the pool was shut down are dropped.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        drop(self.handle.spawn_blocking(job));
    }
}
