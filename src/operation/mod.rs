// src/operation/mod.rs

//! Restartable, cancellable single-slot operations.
//!
//! A [`RestartableOperation`] runs a caller-supplied unit of work every time
//! it is started. Starting again while a previous unit is still running
//! cancels that unit's token (cooperatively) and launches a new one; the
//! superseded unit still reports its own *ended* event once it actually
//! terminates, and [`RestartableOperation::is_running`] stays true until
//! every accepted start has ended.
//!
//! - [`builder`] configures the work supplier and completion context.
//! - [`work`] defines [`WorkHandle`], [`Outcome`] and [`CompletedWork`].
//! - [`slot`] is the lock-free cancellation slot.

pub mod builder;
pub(crate) mod slot;
pub mod work;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, WorkPanicked};
use crate::events::{Event, SubscriptionId, VetoableEvent};
use crate::exec::{self, Dispatcher};
use crate::types::CompletionStatus;

pub use builder::OperationBuilder;
pub use work::{CompletedWork, Outcome, WorkCompleter, WorkHandle};

use slot::CancellationSlot;

pub(crate) type WorkFactory<S> = Arc<dyn Fn(S, CancellationToken) -> WorkHandle + Send + Sync>;
pub(crate) type SyncAction<S> =
    Arc<dyn Fn(S, CancellationToken) -> anyhow::Result<()> + Send + Sync>;

/// Arguments of the *starting* event.
///
/// Handlers may set `cancel` to veto the start and may replace `state`; the
/// values left after the last handler are what `start` acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartingArgs<S> {
    pub state: S,
    pub cancel: bool,
}

impl<S> StartingArgs<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            cancel: false,
        }
    }
}

/// Lifecycle events delivered through [`RestartableOperation::subscribe_channel`].
#[derive(Debug, Clone)]
pub enum OperationEvent<S> {
    Started { state: S },
    Ended(CompletedWork<S>),
}

pub(crate) enum WorkSource<S> {
    Factory(WorkFactory<S>),
    Action {
        action: SyncAction<S>,
        executor: Arc<dyn Dispatcher>,
    },
}

struct OperationInner<S> {
    name: String,
    work: WorkSource<S>,
    completion_context: Arc<dyn Dispatcher>,
    active: CancellationSlot,
    in_flight: AtomicUsize,
    starting: VetoableEvent<StartingArgs<S>>,
    started: Event<S>,
    ended: Event<CompletedWork<S>>,
    /// Internal observers (running flag after each transition); survives `dispose`.
    transitions: Event<bool>,
}

/// Cancellable, restartable single-slot coordinator.
///
/// Cloning yields another handle to the same operation.
pub struct RestartableOperation<S> {
    inner: Arc<OperationInner<S>>,
}

impl<S> Clone for RestartableOperation<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> RestartableOperation<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn builder() -> OperationBuilder<S> {
        OperationBuilder::new()
    }

    /// Shorthand for a factory-driven operation with default settings.
    pub fn with_factory<F>(factory: F) -> Result<Self>
    where
        F: Fn(S, CancellationToken) -> WorkHandle + Send + Sync + 'static,
    {
        Self::builder().factory(factory).build()
    }

    /// Shorthand for an action-driven operation with default settings.
    pub fn with_action<F>(action: F, executor: Arc<dyn Dispatcher>) -> Result<Self>
    where
        F: Fn(S, CancellationToken) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::builder().action(action, executor).build()
    }

    pub(crate) fn from_parts(
        name: String,
        work: WorkSource<S>,
        completion_context: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            inner: Arc::new(OperationInner {
                name,
                work,
                completion_context,
                active: CancellationSlot::new(),
                in_flight: AtomicUsize::new(0),
                starting: VetoableEvent::new(),
                started: Event::new(),
                ended: Event::new(),
                transitions: Event::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Start a new unit of work, superseding the previous one.
    ///
    /// Never blocks and never returns the unit's error; the outcome is only
    /// reported through the *ended* event.
    pub fn start(&self, state: S) {
        let inner = &self.inner;

        // Captured before anything else so *ended* goes back where we came from.
        let context = exec::current().unwrap_or_else(|| Arc::clone(&inner.completion_context));

        let mut args = StartingArgs::new(state);
        inner.starting.emit(&mut args);
        if args.cancel {
            debug!(operation = %inner.name, "start vetoed by a starting handler");
            return;
        }
        let state = args.state;

        let in_flight = inner.in_flight.fetch_add(1, Ordering::AcqRel) + 1;

        let token = CancellationToken::new();
        if let Some(previous) = inner.active.replace(Some(token.clone())) {
            info!(
                operation = %inner.name,
                in_flight,
                "restart requested; cancelling previous unit of work"
            );
            previous.cancel();
        }
        debug!(operation = %inner.name, in_flight, "start accepted");

        let handle = inner.produce(state.clone(), token);

        inner.started.emit(&state);
        inner.transitions.emit(&true);

        match handle.outcome() {
            Some(outcome) => inner.finish(outcome, state),
            None => {
                let inner = Arc::clone(inner);
                handle.on_complete(move |outcome| {
                    context.dispatch(Box::new(move || inner.finish(outcome, state)));
                });
            }
        }
    }

    /// Request cancellation of the current unit of work, if any.
    ///
    /// The unit still reports *ended* itself once it stops; calling this
    /// repeatedly has no further effect.
    pub fn cancel(&self) {
        match self.inner.active.take() {
            Some(token) => {
                debug!(operation = %self.inner.name, "cancellation requested");
                token.cancel();
            }
            None => {
                debug!(operation = %self.inner.name, "cancel requested with nothing to cancel");
            }
        }
    }

    /// True while at least one accepted start has not reported *ended*.
    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Number of accepted starts that have not reported *ended* yet.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn starting(&self) -> &VetoableEvent<StartingArgs<S>> {
        &self.inner.starting
    }

    pub fn started(&self) -> &Event<S> {
        &self.inner.started
    }

    pub fn ended(&self) -> &Event<CompletedWork<S>> {
        &self.inner.ended
    }

    pub fn on_starting<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&mut StartingArgs<S>) + Send + Sync + 'static,
    {
        self.inner.starting.subscribe(handler)
    }

    pub fn on_started<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.inner.started.subscribe(handler)
    }

    pub fn on_ended<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&CompletedWork<S>) + Send + Sync + 'static,
    {
        self.inner.ended.subscribe(handler)
    }

    /// Forward *started* and *ended* into an unbounded channel.
    ///
    /// The forwarding handlers are removed by [`dispose`](Self::dispose)
    /// like any other subscriber, which closes the channel.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<OperationEvent<S>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let started_tx = tx.clone();
        self.inner.started.subscribe(move |state: &S| {
            let _ = started_tx.send(OperationEvent::Started {
                state: state.clone(),
            });
        });
        self.inner.ended.subscribe(move |completed: &CompletedWork<S>| {
            let _ = tx.send(OperationEvent::Ended(completed.clone()));
        });
        rx
    }

    /// Drop every event subscriber and cancel outstanding work.
    ///
    /// Does not wait: units already running finish in the background and
    /// their outcomes go nowhere.
    pub fn dispose(&self) {
        self.inner.starting.clear();
        self.inner.started.clear();
        self.inner.ended.clear();
        self.cancel();
        debug!(operation = %self.inner.name, "operation disposed");
    }

    /// Observe the running flag after every *started* / *ended*.
    pub(crate) fn on_transition<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.inner.transitions.subscribe(handler)
    }
}

impl<S> OperationInner<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    fn produce(&self, state: S, token: CancellationToken) -> WorkHandle {
        match &self.work {
            WorkSource::Factory(factory) => factory(state, token),
            WorkSource::Action { action, executor } => {
                let (completer, handle) = WorkHandle::pending();
                let action = Arc::clone(action);
                executor.dispatch(Box::new(move || {
                    if token.is_cancelled() {
                        // Superseded before it got a chance to run.
                        completer.complete(Outcome::Canceled);
                        return;
                    }
                    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| action(state, token))) {
                        Ok(result) => Outcome::from_result(result),
                        Err(payload) => Outcome::faulted(WorkPanicked::from_payload(payload)),
                    };
                    completer.complete(outcome);
                }));
                handle
            }
        }
    }

    fn finish(&self, outcome: Outcome, state: S) {
        let remaining = self.in_flight.fetch_sub(1, Ordering::AcqRel) - 1;
        let completed = CompletedWork::from_outcome(outcome, state);

        match completed.status() {
            CompletionStatus::Faulted => warn!(
                operation = %self.name,
                in_flight = remaining,
                error = ?completed.error(),
                "unit of work faulted"
            ),
            status => debug!(
                operation = %self.name,
                in_flight = remaining,
                %status,
                "unit of work ended"
            ),
        }

        self.ended.emit(&completed);
        self.transitions.emit(&self.is_running());
    }
}

impl<S> fmt::Debug for RestartableOperation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestartableOperation")
            .field("name", &self.inner.name)
            .field("in_flight", &self.inner.in_flight.load(Ordering::Acquire))
            .field("armed", &self.inner.active.is_armed())
            .finish()
    }
}
