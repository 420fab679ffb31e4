// src/operation/builder.rs

//! Construction of [`RestartableOperation`]s.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::work::WorkHandle;
use super::{RestartableOperation, SyncAction, WorkFactory, WorkSource};
use crate::errors::{CoordinatorError, Result};
use crate::exec::{Dispatcher, InlineDispatcher};

const DEFAULT_NAME: &str = "operation";

/// Builder for [`RestartableOperation`].
///
/// Exactly one work supplier must be configured: either [`factory`] or
/// [`action`]. [`build`] fails with `InvalidArgument` otherwise, before
/// anything is allocated for the operation.
///
/// [`factory`]: OperationBuilder::factory
/// [`action`]: OperationBuilder::action
/// [`build`]: OperationBuilder::build
pub struct OperationBuilder<S> {
    name: Option<String>,
    factory: Option<WorkFactory<S>>,
    action: Option<(SyncAction<S>, Arc<dyn Dispatcher>)>,
    completion_context: Option<Arc<dyn Dispatcher>>,
}

impl<S> OperationBuilder<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            name: None,
            factory: None,
            action: None,
            completion_context: None,
        }
    }

    /// Name used in log output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Work supplied as a factory returning an already started unit of work.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(S, CancellationToken) -> WorkHandle + Send + Sync + 'static,
    {
        let factory: WorkFactory<S> = Arc::new(factory);
        self.factory = Some(factory);
        self
    }

    /// Work supplied as a synchronous action run on `executor`.
    pub fn action<F>(mut self, action: F, executor: Arc<dyn Dispatcher>) -> Self
    where
        F: Fn(S, CancellationToken) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let action: SyncAction<S> = Arc::new(action);
        self.action = Some((action, executor));
        self
    }

    /// Where *ended* is delivered when `start` is called from a thread
    /// without an ambient context. Defaults to [`InlineDispatcher`], i.e. the
    /// thread that finished the work.
    pub fn completion_context(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.completion_context = Some(dispatcher);
        self
    }

    pub fn build(self) -> Result<RestartableOperation<S>> {
        let work = match (self.factory, self.action) {
            (Some(factory), None) => WorkSource::Factory(factory),
            (None, Some((action, executor))) => WorkSource::Action { action, executor },
            (None, None) => {
                return Err(CoordinatorError::invalid_argument(
                    "a work factory or a work action is required",
                ));
            }
            (Some(_), Some(_)) => {
                return Err(CoordinatorError::invalid_argument(
                    "configure either a work factory or a work action, not both",
                ));
            }
        };

        let name = self.name.unwrap_or_else(|| DEFAULT_NAME.to_string());
        let completion_context = self
            .completion_context
            .unwrap_or_else(InlineDispatcher::shared);

        Ok(RestartableOperation::from_parts(name, work, completion_context))
    }
}

impl<S> Default for OperationBuilder<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for OperationBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationBuilder")
            .field("name", &self.name)
            .field("factory", &self.factory.is_some())
            .field("action", &self.action.is_some())
            .finish()
    }
}
