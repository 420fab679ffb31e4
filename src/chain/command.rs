// src/chain/command.rs

//! Chainable commands.

use std::fmt;
use std::sync::{Arc, Weak};

use tracing::trace;

use super::CommandChain;
use crate::events::{Event, SubscriptionId};
use crate::types::EnablementPolicy;

/// What a concrete command does on its own.
///
/// These are the per-member hooks a chain evaluates; the chain decides how
/// they combine.
pub trait CommandAction<P>: Send + Sync {
    /// Whether this command alone is currently able to run.
    fn can_execute(&self, _parameter: &P) -> bool {
        true
    }

    fn execute(&self, parameter: &P);
}

pub(crate) struct CommandInner<P> {
    action: Box<dyn CommandAction<P>>,
    chain: Option<CommandChain<P>>,
    enablement_changed: Event<()>,
}

impl<P> CommandInner<P> {
    fn can_execute_self(&self, parameter: &P) -> bool {
        self.action.can_execute(parameter)
    }

    fn execute_self(&self, parameter: &P) {
        self.action.execute(parameter);
    }

    fn raise_enablement_changed(&self) {
        self.enablement_changed.emit(&());
    }
}

/// A command that either stands alone or belongs to exactly one chain.
///
/// Cloning yields another handle to the same command.
pub struct ChainedCommand<P> {
    inner: Arc<CommandInner<P>>,
}

impl<P> Clone for ChainedCommand<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: 'static> ChainedCommand<P> {
    /// A command outside of any chain.
    pub fn new<A>(action: A) -> Self
    where
        A: CommandAction<P> + 'static,
    {
        Self::build(None, Box::new(action))
    }

    /// A command that joins `chain` for its whole lifetime.
    pub fn in_chain<A>(chain: &CommandChain<P>, action: A) -> Self
    where
        A: CommandAction<P> + 'static,
    {
        Self::build(Some(chain.clone()), Box::new(action))
    }

    pub(crate) fn build(chain: Option<CommandChain<P>>, action: Box<dyn CommandAction<P>>) -> Self {
        let inner = Arc::new(CommandInner {
            action,
            chain,
            enablement_changed: Event::new(),
        });
        if let Some(chain) = &inner.chain {
            chain.add(Arc::downgrade(&inner));
        }
        Self { inner }
    }

    pub fn chain(&self) -> Option<&CommandChain<P>> {
        self.inner.chain.as_ref()
    }

    /// Effective enablement under the chain's policy.
    ///
    /// Each member's own check runs at most once per call, in chain order,
    /// and evaluation stops as soon as the result is known.
    pub fn can_execute(&self, parameter: &P) -> bool {
        let Some(chain) = &self.inner.chain else {
            return self.inner.can_execute_self(parameter);
        };
        match chain.policy() {
            EnablementPolicy::WhenThis => self.inner.can_execute_self(parameter),
            EnablementPolicy::WhenAll => chain
                .snapshot()
                .iter()
                .all(|member| member.can_execute_self(parameter)),
            EnablementPolicy::WhenAny => chain
                .snapshot()
                .iter()
                .any(|member| member.can_execute_self(parameter)),
        }
    }

    /// Run this command, or every member when the chain fans out.
    ///
    /// Enablement is not consulted.
    pub fn execute(&self, parameter: &P) {
        match &self.inner.chain {
            Some(chain) if chain.execute_all_on_any() => {
                let members = chain.snapshot();
                trace!(members = members.len(), "executing every member of the chain");
                for member in members {
                    member.execute_self(parameter);
                }
            }
            _ => self.inner.execute_self(parameter),
        }
    }

    /// Raise enablement-changed on every live chain member, or on this
    /// command when it stands alone.
    pub fn notify_enablement_changed(&self) {
        match &self.inner.chain {
            Some(chain) => {
                for member in chain.snapshot() {
                    member.raise_enablement_changed();
                }
            }
            None => self.inner.raise_enablement_changed(),
        }
    }

    pub fn on_enablement_changed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.enablement_changed.subscribe(move |_: &()| handler())
    }

    pub fn remove_enablement_handler(&self, id: SubscriptionId) -> bool {
        self.inner.enablement_changed.unsubscribe(id)
    }

    pub fn downgrade(&self) -> WeakCommand<P> {
        WeakCommand {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &ChainedCommand<P>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<P> fmt::Debug for ChainedCommand<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedCommand")
            .field("chain", &self.inner.chain)
            .field("enablement_handlers", &self.inner.enablement_changed.len())
            .finish()
    }
}

/// Non-owning handle to a [`ChainedCommand`].
pub struct WeakCommand<P> {
    inner: Weak<CommandInner<P>>,
}

impl<P> Clone for WeakCommand<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<P> WeakCommand<P> {
    pub fn upgrade(&self) -> Option<ChainedCommand<P>> {
        self.inner.upgrade().map(|inner| ChainedCommand { inner })
    }
}

impl<P> fmt::Debug for WeakCommand<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCommand")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
