// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The filter is built from, in order of priority:
//! 1. `--log-level`, applied to this crate's targets only
//! 2. `RESTARTABLE_LOG`: a bare level ("debug") is scoped to this crate like
//!    the flag; anything else is taken as a full `EnvFilter` directive list
//!    (e.g. `"info,restartable::chain=trace"`)
//! 3. `info` for this crate
//!
//! Other crates (tokio internals) stay at `warn` unless a directive list says
//! otherwise. Logs go to STDERR so that stdout carries only the run summary.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const ENV_VAR: &str = "RESTARTABLE_LOG";

const CRATE_TARGET: &str = "restartable";
const OTHER_TARGETS: &str = "warn";

/// Initialise global logging subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(ENV_VAR).ok();
    let filter = EnvFilter::try_new(filter_directives(cli_level, env.as_deref()))?;

    // Thread names matter here: *ended* is delivered on a specific thread.
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// Directive string for the subscriber's `EnvFilter`.
pub fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return scoped(level_name(level));
    }
    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => match bare_level(value) {
            Some(level) => scoped(level),
            None if EnvFilter::try_new(value).is_ok() => value.to_string(),
            None => scoped("info"),
        },
        None => scoped("info"),
    }
}

fn scoped(level: &str) -> String {
    format!("{OTHER_TARGETS},{CRATE_TARGET}={level}")
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn bare_level(s: &str) -> Option<&'static str> {
    match s.to_lowercase().as_str() {
        "error" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_wins_over_environment() {
        assert_eq!(
            filter_directives(Some(LogLevel::Debug), Some("trace")),
            "warn,restartable=debug"
        );
    }

    #[test]
    fn bare_env_level_is_scoped_to_this_crate() {
        assert_eq!(
            filter_directives(None, Some(" Warning ")),
            "warn,restartable=warn"
        );
    }

    #[test]
    fn env_directive_list_is_used_verbatim() {
        assert_eq!(
            filter_directives(None, Some("info,restartable::chain=trace")),
            "info,restartable::chain=trace"
        );
    }

    #[test]
    fn unusable_env_falls_back_to_info() {
        assert_eq!(filter_directives(None, None), "warn,restartable=info");
        assert_eq!(filter_directives(None, Some("  ")), "warn,restartable=info");
        assert_eq!(
            filter_directives(None, Some("restartable=loud")),
            "warn,restartable=info"
        );
    }
}
