// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How a chained command resolves `can_execute` against its chain.
///
/// - `WhenThis`: only the command's own check counts; the chain is ignored.
/// - `WhenAll`: every member's own check must pass (short-circuit AND).
/// - `WhenAny`: at least one member's own check must pass (short-circuit OR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnablementPolicy {
    WhenThis,
    WhenAll,
    WhenAny,
}

impl Default for EnablementPolicy {
    fn default() -> Self {
        EnablementPolicy::WhenThis
    }
}

impl FromStr for EnablementPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "when_this" | "this" => Ok(EnablementPolicy::WhenThis),
            "when_all" | "all" => Ok(EnablementPolicy::WhenAll),
            "when_any" | "any" => Ok(EnablementPolicy::WhenAny),
            other => Err(format!(
                "invalid enablement policy: {other} (expected \"when_this\", \"when_all\" or \"when_any\")"
            )),
        }
    }
}

/// Where synchronous units of work are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    /// Tokio's blocking thread pool.
    ThreadPool,
    /// A single dedicated thread shared by every start of the operation.
    Dedicated,
    /// On the thread that calls `start`. Mostly useful in tests.
    Inline,
}

impl Default for ExecutorKind {
    fn default() -> Self {
        ExecutorKind::ThreadPool
    }
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "thread_pool" | "pool" => Ok(ExecutorKind::ThreadPool),
            "dedicated" => Ok(ExecutorKind::Dedicated),
            "inline" => Ok(ExecutorKind::Inline),
            other => Err(format!(
                "invalid executor: {other} (expected \"thread_pool\", \"dedicated\" or \"inline\")"
            )),
        }
    }
}

/// Terminal status of a unit of work as reported by the *ended* event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionStatus {
    Completed,
    Canceled,
    Faulted,
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompletionStatus::Completed => "completed",
            CompletionStatus::Canceled => "canceled",
            CompletionStatus::Faulted => "faulted",
        };
        f.write_str(s)
    }
}
