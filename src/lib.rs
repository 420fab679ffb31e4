// src/lib.rs

pub mod chain;
pub mod cli;
pub mod commanded;
pub mod config;
pub mod demo;
pub mod errors;
pub mod events;
pub mod exec;
pub mod logging;
pub mod operation;
pub mod types;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_from_path;
use crate::config::model::{CoordinatorConfig, RawCoordinatorConfig};

pub use crate::chain::{ChainedCommand, CommandAction, CommandChain};
pub use crate::commanded::CommandedRestartableOperation;
pub use crate::errors::{Canceled, CoordinatorError};
pub use crate::operation::{CompletedWork, RestartableOperation, StartingArgs, WorkHandle};
pub use crate::types::{CompletionStatus, EnablementPolicy};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file or built-in defaults) and CLI overrides
/// - the work executor and the "ui" dispatch queue
/// - linked commanded operations, a restart, and a chained stop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    info!(
        operations = cfg.demo.operations,
        executor = ?cfg.execution.executor,
        "starting demo"
    );
    let summary = demo::run_demo(&cfg).await?;
    summary.print();
    Ok(())
}

/// Load the config (or defaults), apply CLI overrides, then validate.
fn resolve_config(args: &CliArgs) -> Result<CoordinatorConfig> {
    let mut raw = match &args.config {
        Some(path) => load_from_path(path)?,
        None => RawCoordinatorConfig::default(),
    };
    if let Some(operations) = args.operations {
        raw.demo.operations = operations;
    }
    Ok(CoordinatorConfig::try_from(raw)?)
}

/// Simple dry-run output: print chain policies, executor and demo timings.
fn print_dry_run(cfg: &CoordinatorConfig) {
    println!("restartable dry-run");
    println!(
        "  chains.start = execute_all_on_any: {}, enablement: {:?}",
        cfg.chains.start.execute_all_on_any, cfg.chains.start.enablement
    );
    println!(
        "  chains.stop = execute_all_on_any: {}, enablement: {:?}",
        cfg.chains.stop.execute_all_on_any, cfg.chains.stop.enablement
    );
    println!("  execution.executor = {:?}", cfg.execution.executor);
    println!("  execution.thread_name = {}", cfg.execution.thread_name);
    println!();

    let demo = &cfg.demo;
    println!("demo:");
    println!("  operations: {}", demo.operations);
    println!("  steps: {} x {}ms", demo.steps, demo.step_ms);
    println!("  restart_after_ms: {}", demo.restart_after_ms);
    println!("  timeout_ms: {}", demo.timeout_ms);

    debug!("dry-run complete (no execution)");
}
