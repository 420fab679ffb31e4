// src/config/model.rs

use std::sync::Arc;

use serde::Deserialize;
use tokio::runtime::Handle;

use crate::errors::Result;
use crate::exec::{DispatchQueue, Dispatcher, InlineDispatcher, TokioDispatcher};
use crate::types::{EnablementPolicy, ExecutorKind};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [chains.start]
/// execute_all_on_any = false
/// enablement = "when_all"
///
/// [chains.stop]
/// execute_all_on_any = true
/// enablement = "when_any"
///
/// [execution]
/// executor = "thread_pool"
///
/// [demo]
/// operations = 3
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCoordinatorConfig {
    #[serde(default)]
    pub chains: ChainsSection,

    #[serde(default)]
    pub execution: ExecutionSection,

    #[serde(default)]
    pub demo: DemoSection,
}

/// Validated configuration. Build it with `TryFrom<RawCoordinatorConfig>`.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub chains: ChainsSection,
    pub execution: ExecutionSection,
    pub demo: DemoSection,
}

impl CoordinatorConfig {
    pub(crate) fn new_unchecked(
        chains: ChainsSection,
        execution: ExecutionSection,
        demo: DemoSection,
    ) -> Self {
        Self {
            chains,
            execution,
            demo,
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        let raw = RawCoordinatorConfig::default();
        Self::new_unchecked(raw.chains, raw.execution, raw.demo)
    }
}

/// Policy of a single chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainPolicy {
    /// Executing any member executes every member.
    #[serde(default)]
    pub execute_all_on_any: bool,

    /// `"when_this"`, `"when_all"` or `"when_any"`.
    #[serde(default)]
    pub enablement: EnablementPolicy,
}

impl ChainPolicy {
    pub const fn new(execute_all_on_any: bool, enablement: EnablementPolicy) -> Self {
        Self {
            execute_all_on_any,
            enablement,
        }
    }

    /// Start commands: each starts only itself, and none is enabled while
    /// any linked operation runs.
    pub const fn start_default() -> Self {
        Self::new(false, EnablementPolicy::WhenAll)
    }

    /// Stop commands: enabled while any linked operation runs, and stopping
    /// one stops them all.
    pub const fn stop_default() -> Self {
        Self::new(true, EnablementPolicy::WhenAny)
    }
}

/// `[chains]` section: policies for commanded operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainsSection {
    #[serde(default = "ChainPolicy::start_default")]
    pub start: ChainPolicy,

    #[serde(default = "ChainPolicy::stop_default")]
    pub stop: ChainPolicy,
}

impl Default for ChainsSection {
    fn default() -> Self {
        Self {
            start: ChainPolicy::start_default(),
            stop: ChainPolicy::stop_default(),
        }
    }
}

/// `[execution]` section: where synchronous work runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionSection {
    /// `"thread_pool"` (default), `"dedicated"` or `"inline"`.
    #[serde(default)]
    pub executor: ExecutorKind,

    /// Name of the worker thread when `executor = "dedicated"`.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_thread_name() -> String {
    "restartable-worker".to_string()
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            executor: ExecutorKind::default(),
            thread_name: default_thread_name(),
        }
    }
}

impl ExecutionSection {
    /// Build the dispatcher that runs synchronous units of work.
    pub fn build_dispatcher(&self, handle: &Handle) -> Result<Arc<dyn Dispatcher>> {
        let dispatcher: Arc<dyn Dispatcher> = match self.executor {
            ExecutorKind::ThreadPool => Arc::new(TokioDispatcher::blocking(handle.clone())),
            ExecutorKind::Dedicated => Arc::new(DispatchQueue::spawn(&self.thread_name)?),
            ExecutorKind::Inline => Arc::new(InlineDispatcher),
        };
        Ok(dispatcher)
    }
}

/// `[demo]` section used by the bundled binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoSection {
    /// Number of linked operations.
    #[serde(default = "default_operations")]
    pub operations: usize,

    /// Iterations of each simulated unit of work.
    #[serde(default = "default_steps")]
    pub steps: u32,

    /// Sleep per iteration, in milliseconds.
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,

    /// Delay before the first operation is restarted.
    #[serde(default = "default_restart_after_ms")]
    pub restart_after_ms: u64,

    /// Give up and stop everything after this long.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_operations() -> usize {
    3
}

fn default_steps() -> u32 {
    20
}

fn default_step_ms() -> u64 {
    10
}

fn default_restart_after_ms() -> u64 {
    40
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for DemoSection {
    fn default() -> Self {
        Self {
            operations: default_operations(),
            steps: default_steps(),
            step_ms: default_step_ms(),
            restart_after_ms: default_restart_after_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}
