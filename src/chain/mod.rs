// src/chain/mod.rs

//! Command chains.
//!
//! A [`CommandChain`] groups [`ChainedCommand`]s that share two policies:
//!
//! - `execute_all_on_any`: executing any member executes every member;
//! - [`EnablementPolicy`]: how a member's `can_execute` combines the
//!   members' own checks.
//!
//! Membership is fixed when a command is built (`in_chain`), and the chain
//! only holds members weakly: a command that has been dropped no longer
//! takes part in evaluation.
//!
//! - `members` is the ordered membership list.
//! - [`command`] holds the command type and its capability trait.
//! - [`relay`] builds commands out of closures.

pub mod command;
mod members;
pub mod relay;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::config::ChainPolicy;
use crate::types::EnablementPolicy;

pub use command::{ChainedCommand, CommandAction, WeakCommand};
pub use relay::RelayCommandBuilder;

use command::CommandInner;
use members::MemberSet;

struct ChainInner<P> {
    execute_all_on_any: bool,
    policy: EnablementPolicy,
    members: RwLock<MemberSet<Weak<CommandInner<P>>>>,
}

/// Shared policy and membership for a group of commands.
///
/// Cloning yields another handle to the same chain.
pub struct CommandChain<P> {
    inner: Arc<ChainInner<P>>,
}

impl<P> Clone for CommandChain<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: 'static> CommandChain<P> {
    pub fn new(execute_all_on_any: bool, policy: EnablementPolicy) -> Self {
        Self {
            inner: Arc::new(ChainInner {
                execute_all_on_any,
                policy,
                members: RwLock::new(MemberSet::new()),
            }),
        }
    }

    pub fn from_policy(policy: &ChainPolicy) -> Self {
        Self::new(policy.execute_all_on_any, policy.enablement)
    }

    pub fn execute_all_on_any(&self) -> bool {
        self.inner.execute_all_on_any
    }

    pub fn policy(&self) -> EnablementPolicy {
        self.inner.policy
    }

    /// Number of live members.
    pub fn len(&self) -> usize {
        self.inner
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|member| member.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every member.
    ///
    /// Commands built in this chain keep referring to it and see an empty
    /// membership: `WhenAll` holds, `WhenAny` fails, fan-out runs nothing.
    pub fn clear(&self) {
        self.inner
            .members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn same_chain(&self, other: &CommandChain<P>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn add(&self, member: Weak<CommandInner<P>>) {
        let mut members = self
            .inner
            .members
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        members.retain(|existing| existing.strong_count() > 0);
        members.prepend(member);
    }

    /// Live members in chain order, most recently added first.
    ///
    /// The lock is released before returning so member callbacks can freely
    /// touch the chain again.
    pub(crate) fn snapshot(&self) -> Vec<Arc<CommandInner<P>>> {
        self.inner
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

impl<P> fmt::Debug for CommandChain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members = self
            .inner
            .members
            .read()
            .map(|m| m.len())
            .unwrap_or_default();
        f.debug_struct("CommandChain")
            .field("execute_all_on_any", &self.inner.execute_all_on_any)
            .field("policy", &self.inner.policy)
            .field("members", &members)
            .finish()
    }
}
