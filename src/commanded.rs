// src/commanded.rs

//! Restartable operations driven through start/stop commands.
//!
//! A [`CommandedRestartableOperation`] pairs an operation with:
//!
//! - a start command (parameter = the state to start with), enabled while
//!   the operation is idle;
//! - a stop command (parameter `()`), enabled while it runs.
//!
//! Each command sits in a chain. Siblings made with
//! [`create_linked`](CommandedRestartableOperation::create_linked) share
//! those chains, so with the default policies no start is enabled while any
//! sibling runs, and one stop cancels every sibling.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::chain::{ChainedCommand, CommandAction, CommandChain};
use crate::config::ChainsSection;
use crate::events::{Event, SubscriptionId};
use crate::operation::RestartableOperation;

struct StartAction<S> {
    operation: RestartableOperation<S>,
}

impl<S> CommandAction<S> for StartAction<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn can_execute(&self, _state: &S) -> bool {
        !self.operation.is_running()
    }

    fn execute(&self, state: &S) {
        self.operation.start(state.clone());
    }
}

struct StopAction<S> {
    operation: RestartableOperation<S>,
}

impl<S> CommandAction<()> for StopAction<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn can_execute(&self, _: &()) -> bool {
        self.operation.is_running()
    }

    fn execute(&self, _: &()) {
        self.operation.cancel();
    }
}

/// A restartable operation exposed through chained start/stop commands.
pub struct CommandedRestartableOperation<S> {
    operation: RestartableOperation<S>,
    start_command: ChainedCommand<S>,
    stop_command: ChainedCommand<()>,
    running_changed: Arc<Event<bool>>,
}

impl<S> CommandedRestartableOperation<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Wrap `operation` with fresh chains using the default policies.
    pub fn new(operation: RestartableOperation<S>) -> Self {
        Self::with_policies(operation, &ChainsSection::default())
    }

    /// Wrap `operation` with fresh chains using the given policies.
    pub fn with_policies(operation: RestartableOperation<S>, policies: &ChainsSection) -> Self {
        let start_chain = CommandChain::from_policy(&policies.start);
        let stop_chain = CommandChain::from_policy(&policies.stop);
        Self::with_chains(operation, &start_chain, &stop_chain)
    }

    /// Wrap `operation`, joining existing chains.
    pub fn with_chains(
        operation: RestartableOperation<S>,
        start_chain: &CommandChain<S>,
        stop_chain: &CommandChain<()>,
    ) -> Self {
        let start_command = ChainedCommand::in_chain(
            start_chain,
            StartAction {
                operation: operation.clone(),
            },
        );
        let stop_command = ChainedCommand::in_chain(
            stop_chain,
            StopAction {
                operation: operation.clone(),
            },
        );
        let running_changed = Arc::new(Event::new());

        // Weak handles: the commands own the operation, not the other way round.
        let start_weak = start_command.downgrade();
        let stop_weak = stop_command.downgrade();
        let running = Arc::downgrade(&running_changed);
        let name = operation.name().to_string();
        operation.on_transition(move |is_running: &bool| {
            trace!(operation = %name, is_running, "refreshing command enablement");
            if let Some(start) = start_weak.upgrade() {
                start.notify_enablement_changed();
            }
            if let Some(stop) = stop_weak.upgrade() {
                stop.notify_enablement_changed();
            }
            if let Some(running) = running.upgrade() {
                running.emit(is_running);
            }
        });

        Self {
            operation,
            start_command,
            stop_command,
            running_changed,
        }
    }

    /// Wrap `operation` so that its commands join this instance's chains.
    pub fn create_linked(&self, operation: RestartableOperation<S>) -> Self {
        let (Some(start_chain), Some(stop_chain)) =
            (self.start_command.chain(), self.stop_command.chain())
        else {
            // Commands built here always have a chain.
            return Self::new(operation);
        };
        Self::with_chains(operation, start_chain, stop_chain)
    }

    pub fn operation(&self) -> &RestartableOperation<S> {
        &self.operation
    }

    pub fn start_command(&self) -> &ChainedCommand<S> {
        &self.start_command
    }

    pub fn stop_command(&self) -> &ChainedCommand<()> {
        &self.stop_command
    }

    pub fn is_running(&self) -> bool {
        self.operation.is_running()
    }

    pub fn start(&self, state: S) {
        self.operation.start(state);
    }

    pub fn cancel(&self) {
        self.operation.cancel();
    }

    /// Subscribe to changes of [`is_running`](Self::is_running).
    ///
    /// Raised after every *started* and *ended*, with the value at that moment.
    pub fn on_running_changed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.running_changed
            .subscribe(move |is_running: &bool| handler(*is_running))
    }

    pub fn remove_running_handler(&self, id: SubscriptionId) -> bool {
        self.running_changed.unsubscribe(id)
    }

    /// Dispose the operation and drop running-changed subscribers.
    pub fn dispose(&self) {
        self.running_changed.clear();
        self.operation.dispose();
    }
}

impl<S> fmt::Debug for CommandedRestartableOperation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandedRestartableOperation")
            .field("operation", &self.operation)
            .field("start_command", &self.start_command)
            .field("stop_command", &self.stop_command)
            .finish()
    }
}
