// src/chain/relay.rs

//! Commands assembled from closures.

use std::fmt;

use super::command::{ChainedCommand, CommandAction};
use super::CommandChain;
use crate::errors::{CoordinatorError, Result};

type ExecuteFn<P> = Box<dyn Fn(&P) + Send + Sync>;
type CanExecuteFn<P> = Box<dyn Fn(&P) -> bool + Send + Sync>;

struct RelayAction<P> {
    execute: ExecuteFn<P>,
    can_execute: Option<CanExecuteFn<P>>,
}

impl<P> CommandAction<P> for RelayAction<P> {
    fn can_execute(&self, parameter: &P) -> bool {
        self.can_execute
            .as_ref()
            .is_none_or(|check| check(parameter))
    }

    fn execute(&self, parameter: &P) {
        (self.execute)(parameter);
    }
}

/// Builder for closure-backed commands.
///
/// ```
/// use restartable::chain::{ChainedCommand, CommandChain};
/// use restartable::types::EnablementPolicy;
///
/// let chain = CommandChain::<u32>::new(false, EnablementPolicy::WhenAll);
/// let cmd = ChainedCommand::relay()
///     .in_chain(&chain)
///     .execute(|n: &u32| println!("run {n}"))
///     .can_execute(|n: &u32| *n > 0)
///     .build()
///     .unwrap();
/// assert!(cmd.can_execute(&1));
/// assert!(!cmd.can_execute(&0));
/// ```
pub struct RelayCommandBuilder<P> {
    chain: Option<CommandChain<P>>,
    execute: Option<ExecuteFn<P>>,
    can_execute: Option<CanExecuteFn<P>>,
}

impl<P: 'static> RelayCommandBuilder<P> {
    pub fn new() -> Self {
        Self {
            chain: None,
            execute: None,
            can_execute: None,
        }
    }

    pub fn in_chain(mut self, chain: &CommandChain<P>) -> Self {
        self.chain = Some(chain.clone());
        self
    }

    pub fn execute<F>(mut self, execute: F) -> Self
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let execute: ExecuteFn<P> = Box::new(execute);
        self.execute = Some(execute);
        self
    }

    /// Optional; a command without a check is always enabled on its own.
    pub fn can_execute<F>(mut self, can_execute: F) -> Self
    where
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        let can_execute: CanExecuteFn<P> = Box::new(can_execute);
        self.can_execute = Some(can_execute);
        self
    }

    /// Fails with `InvalidArgument` when no execute closure was given.
    pub fn build(self) -> Result<ChainedCommand<P>> {
        let execute = self
            .execute
            .ok_or_else(|| CoordinatorError::invalid_argument("execute"))?;
        let action = RelayAction {
            execute,
            can_execute: self.can_execute,
        };
        Ok(ChainedCommand::build(self.chain, Box::new(action)))
    }
}

impl<P: 'static> Default for RelayCommandBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for RelayCommandBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayCommandBuilder")
            .field("chain", &self.chain)
            .field("execute", &self.execute.is_some())
            .field("can_execute", &self.can_execute.is_some())
            .finish()
    }
}

impl<P: 'static> ChainedCommand<P> {
    pub fn relay() -> RelayCommandBuilder<P> {
        RelayCommandBuilder::new()
    }
}
