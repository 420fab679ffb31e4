// src/operation/work.rs

//! Units of work and their outcomes.
//!
//! A [`WorkHandle`] is the operation's view of one started unit of work. It
//! can be asked whether it is finished and can carry exactly one completion
//! continuation. The producing side holds a [`WorkCompleter`] (or the handle
//! was created already finished).

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;

use crate::errors::{Canceled, CoordinatorError, Result, WorkPanicked};
use crate::types::CompletionStatus;

/// Terminal result of a unit of work.
#[derive(Debug, Clone)]
pub enum Outcome {
    Completed,
    Canceled,
    /// The original error, shared so every *ended* subscriber can inspect it.
    Faulted(Arc<anyhow::Error>),
}

impl Outcome {
    pub fn faulted(error: impl Into<anyhow::Error>) -> Self {
        Outcome::Faulted(Arc::new(error.into()))
    }

    /// Classify what a unit of work returned.
    ///
    /// An error that is (or wraps) [`Canceled`] counts as a cancellation;
    /// anything else is a fault.
    pub fn from_result(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => Outcome::Completed,
            Err(e) if e.downcast_ref::<Canceled>().is_some() => Outcome::Canceled,
            Err(e) => Outcome::Faulted(Arc::new(e)),
        }
    }

    pub fn status(&self) -> CompletionStatus {
        match self {
            Outcome::Completed => CompletionStatus::Completed,
            Outcome::Canceled => CompletionStatus::Canceled,
            Outcome::Faulted(_) => CompletionStatus::Faulted,
        }
    }

    pub fn error(&self) -> Option<&Arc<anyhow::Error>> {
        match self {
            Outcome::Faulted(e) => Some(e),
            _ => None,
        }
    }
}

/// Payload of the *ended* event.
#[derive(Debug, Clone)]
pub struct CompletedWork<S> {
    status: CompletionStatus,
    error: Option<Arc<anyhow::Error>>,
    state: S,
}

impl<S> CompletedWork<S> {
    /// Build from explicit parts.
    ///
    /// `Faulted` requires an error; `Completed` and `Canceled` must not carry one.
    pub fn new(
        status: CompletionStatus,
        error: Option<Arc<anyhow::Error>>,
        state: S,
    ) -> Result<Self> {
        match (status, &error) {
            (CompletionStatus::Faulted, None) => Err(CoordinatorError::invalid_argument(
                "a faulted outcome must carry the error that caused it",
            )),
            (CompletionStatus::Completed | CompletionStatus::Canceled, Some(_)) => {
                Err(CoordinatorError::invalid_argument(format!(
                    "a {status} outcome cannot carry an error"
                )))
            }
            _ => Ok(Self { status, error, state }),
        }
    }

    pub fn from_outcome(outcome: Outcome, state: S) -> Self {
        let status = outcome.status();
        let error = match outcome {
            Outcome::Faulted(e) => Some(e),
            _ => None,
        };
        Self { status, error, state }
    }

    pub fn status(&self) -> CompletionStatus {
        self.status
    }

    pub fn error(&self) -> Option<&Arc<anyhow::Error>> {
        self.error.as_ref()
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }
}

type Continuation = Box<dyn FnOnce(Outcome) + Send + 'static>;

enum CompletionState {
    Pending(Option<Continuation>),
    Finished(Outcome),
}

struct Completion {
    state: Mutex<CompletionState>,
}

impl Completion {
    fn finish(&self, outcome: Outcome) -> bool {
        let continuation = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match &mut *state {
                CompletionState::Finished(_) => return false,
                CompletionState::Pending(continuation) => {
                    let continuation = continuation.take();
                    *state = CompletionState::Finished(outcome.clone());
                    continuation
                }
            }
        };
        // Run outside the lock; the continuation may inspect the handle.
        if let Some(continuation) = continuation {
            continuation(outcome);
        }
        true
    }
}

/// Handle to one started unit of work.
pub struct WorkHandle {
    completion: Arc<Completion>,
}

impl WorkHandle {
    /// A handle that finishes when the returned completer is used (or dropped).
    pub fn pending() -> (WorkCompleter, WorkHandle) {
        let completion = Arc::new(Completion {
            state: Mutex::new(CompletionState::Pending(None)),
        });
        let completer = WorkCompleter {
            completion: Arc::clone(&completion),
        };
        (completer, WorkHandle { completion })
    }

    pub fn finished(outcome: Outcome) -> Self {
        Self {
            completion: Arc::new(Completion {
                state: Mutex::new(CompletionState::Finished(outcome)),
            }),
        }
    }

    pub fn completed() -> Self {
        Self::finished(Outcome::Completed)
    }

    pub fn canceled() -> Self {
        Self::finished(Outcome::Canceled)
    }

    pub fn faulted(error: impl Into<anyhow::Error>) -> Self {
        Self::finished(Outcome::faulted(error))
    }

    /// Run `future` as a Tokio task on `handle`.
    ///
    /// A panic inside the future becomes a fault; aborting the task counts as
    /// a cancellation.
    pub fn spawn_on<F>(handle: &Handle, future: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (completer, work) = Self::pending();
        let join = handle.spawn(future);
        handle.spawn(async move {
            let outcome = match join.await {
                Ok(result) => Outcome::from_result(result),
                Err(e) if e.is_cancelled() => Outcome::Canceled,
                Err(e) => match e.try_into_panic() {
                    Ok(payload) => Outcome::faulted(WorkPanicked::from_payload(payload)),
                    Err(e) => Outcome::faulted(e),
                },
            };
            completer.complete(outcome);
        });
        work
    }

    pub fn is_finished(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match &*self
            .completion
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
        {
            CompletionState::Finished(outcome) => Some(outcome.clone()),
            CompletionState::Pending(_) => None,
        }
    }

    /// Attach the completion continuation.
    ///
    /// Runs immediately on the calling thread if the work already finished,
    /// otherwise on whichever thread finishes it. Consumes the handle, so a
    /// unit of work carries at most one continuation.
    pub fn on_complete<F>(self, continuation: F)
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let ready = {
            let mut state = self
                .completion
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match &mut *state {
                CompletionState::Finished(outcome) => Some(outcome.clone()),
                CompletionState::Pending(slot) => {
                    *slot = Some(Box::new(continuation));
                    return;
                }
            }
        };
        if let Some(outcome) = ready {
            continuation(outcome);
        }
    }
}

impl fmt::Debug for WorkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkHandle")
            .field("outcome", &self.outcome())
            .finish()
    }
}

/// Producer side of a pending [`WorkHandle`].
///
/// Dropping it without completing reports [`Outcome::Canceled`], so the
/// operation's in-flight count can never leak.
pub struct WorkCompleter {
    completion: Arc<Completion>,
}

impl WorkCompleter {
    pub fn complete(self, outcome: Outcome) {
        self.completion.finish(outcome);
        // Drop sees a finished state and does nothing.
    }

    pub fn set_result(self, result: anyhow::Result<()>) {
        self.complete(Outcome::from_result(result));
    }

    pub fn succeed(self) {
        self.complete(Outcome::Completed);
    }

    pub fn cancel(self) {
        self.complete(Outcome::Canceled);
    }

    pub fn fail(self, error: impl Into<anyhow::Error>) {
        self.complete(Outcome::faulted(error));
    }
}

impl Drop for WorkCompleter {
    fn drop(&mut self) {
        self.completion.finish(Outcome::Canceled);
    }
}

impl fmt::Debug for WorkCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkCompleter").finish_non_exhaustive()
    }
}
