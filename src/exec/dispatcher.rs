// src/exec/dispatcher.rs

//! Pluggable dispatcher abstraction.
//!
//! Operations talk to a `Dispatcher` instead of a concrete runtime. This makes
//! it easy to run work inline in tests, on Tokio's blocking pool in
//! production, or on a dedicated thread when callers care which thread
//! observes a notification.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use crate::errors::{CoordinatorError, Result};

/// A unit of scheduling handed to a dispatcher.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Trait abstracting where a job runs.
pub trait Dispatcher: Send + Sync + fmt::Debug {
    /// Run `job` on this dispatcher's context.
    ///
    /// Implementations must run every job exactly once unless the context
    /// itself has been shut down, in which case the job is dropped.
    fn dispatch(&self, job: Job);
}

impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    fn dispatch(&self, job: Job) {
        (**self).dispatch(job);
    }
}

/// Runs every job immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl InlineDispatcher {
    pub fn shared() -> Arc<dyn Dispatcher> {
        Arc::new(InlineDispatcher)
    }
}

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: Job) {
        job();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokioMode {
    Blocking,
    Task,
}

/// Dispatches onto a Tokio runtime.
///
/// - [`TokioDispatcher::blocking`] uses `spawn_blocking`; use this for
///   synchronous work that sleeps or blocks.
/// - [`TokioDispatcher::spawn`] wraps the job in a regular task; use this for
///   short callbacks.
#[derive(Debug, Clone)]
pub struct TokioDispatcher {
    handle: Handle,
    mode: TokioMode,
}

impl TokioDispatcher {
    pub fn blocking(handle: Handle) -> Self {
        Self {
            handle,
            mode: TokioMode::Blocking,
        }
    }

    pub fn spawn(handle: Handle) -> Self {
        Self {
            handle,
            mode: TokioMode::Task,
        }
    }

    /// Blocking-pool dispatcher on the runtime the caller is running inside.
    pub fn current_blocking() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| {
            CoordinatorError::invalid_argument(format!(
                "no Tokio runtime available for the thread pool dispatcher: {e}"
            ))
        })?;
        Ok(Self::blocking(handle))
    }

    pub fn shared(self) -> Arc<dyn Dispatcher> {
        Arc::new(self)
    }
}

impl Dispatcher for TokioDispatcher {
    fn dispatch(&self, job: Job) {
        match self.mode {
            TokioMode::Blocking => {
                // Detached: completion is reported through the job itself.
                let _ = self.handle.spawn_blocking(job);
            }
            TokioMode::Task => {
                let _ = self.handle.spawn(async move { job() });
            }
        }
        debug!(mode = ?self.mode, "job dispatched to tokio runtime");
    }
}
