// src/demo.rs

//! Headless walkthrough of linked commanded operations.
//!
//! Mirrors what a front end would do with the library:
//! - a "ui" dispatch queue from which every start/stop is issued, so every
//!   *ended* notification comes back onto that thread;
//! - N operations linked through shared start/stop chains;
//! - one restart (supersession) of the first operation;
//! - a fanned-out stop through the stop chain on timeout or Ctrl-C.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::commanded::CommandedRestartableOperation;
use crate::config::CoordinatorConfig;
use crate::errors::Canceled;
use crate::exec::{DispatchQueue, Dispatcher};
use crate::operation::{CompletedWork, RestartableOperation};
use crate::types::CompletionStatus;

/// Outcome of a single run, as observed on the ui thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run: u32,
    pub status: CompletionStatus,
    pub on_ui_thread: bool,
}

/// Per-operation run reports, keyed by operation name.
#[derive(Debug, Clone, Default)]
pub struct DemoSummary {
    pub runs: BTreeMap<String, Vec<RunReport>>,
}

impl DemoSummary {
    pub fn total(&self) -> usize {
        self.runs.values().map(Vec::len).sum()
    }

    pub fn print(&self) {
        println!("restartable demo summary");
        for (name, runs) in &self.runs {
            println!("  - {name}");
            for report in runs {
                println!(
                    "      run {}: {} (ended on ui thread: {})",
                    report.run, report.status, report.on_ui_thread
                );
            }
        }
    }
}

type Linked = Arc<Vec<CommandedRestartableOperation<u32>>>;

/// Run the walkthrough and collect what every operation reported.
pub async fn run_demo(cfg: &CoordinatorConfig) -> Result<DemoSummary> {
    let demo = cfg.demo;
    let executor = cfg
        .execution
        .build_dispatcher(&Handle::current())
        .context("building work executor")?;
    let ui = DispatchQueue::spawn("ui").context("spawning ui dispatch queue")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<(String, RunReport)>();
    let step = Duration::from_millis(demo.step_ms);
    let steps = demo.steps;

    let mut linked: Vec<CommandedRestartableOperation<u32>> = Vec::with_capacity(demo.operations);
    for index in 0..demo.operations {
        let name = format!("work-{}", index + 1);
        let operation = RestartableOperation::builder()
            .name(name.clone())
            .action(
                move |_run: u32, token: CancellationToken| simulate_work(&token, steps, step),
                Arc::clone(&executor),
            )
            .build()?;

        let started_name = name.clone();
        operation.on_started(move |run: &u32| {
            info!(operation = %started_name, run, "run started");
        });

        let ended_tx = tx.clone();
        let ended_name = name.clone();
        let ui_queue = ui.clone();
        operation.on_ended(move |completed: &CompletedWork<u32>| {
            let report = RunReport {
                run: *completed.state(),
                status: completed.status(),
                on_ui_thread: ui_queue.is_current(),
            };
            info!(operation = %ended_name, run = report.run, status = %report.status, "run ended");
            let _ = ended_tx.send((ended_name.clone(), report));
        });

        let commanded = match linked.first() {
            Some(first) => first.create_linked(operation),
            None => CommandedRestartableOperation::with_policies(operation, &cfg.chains),
        };
        linked.push(commanded);
    }
    drop(tx);
    let linked: Linked = Arc::new(linked);

    // Kick everything off from the ui thread.
    let expected = demo.operations + 1;
    {
        let linked = Arc::clone(&linked);
        ui.dispatch(Box::new(move || start_all(&linked)));
    }

    tokio::time::sleep(Duration::from_millis(demo.restart_after_ms)).await;
    {
        let linked = Arc::clone(&linked);
        ui.dispatch(Box::new(move || {
            if let Some(first) = linked.first() {
                info!(operation = %first.operation().name(), "restarting");
                first.start(2);
            }
        }));
    }

    let mut summary = DemoSummary::default();
    let deadline = tokio::time::sleep(Duration::from_millis(demo.timeout_ms));
    tokio::pin!(deadline);
    let mut stop_requested = false;

    while summary.total() < expected {
        tokio::select! {
            received = rx.recv() => {
                let Some((name, report)) = received else { break };
                summary.runs.entry(name).or_default().push(report);
            }
            _ = &mut deadline, if !stop_requested => {
                warn!("timeout reached; stopping every linked operation");
                stop_all(&ui, &linked);
                stop_requested = true;
            }
            _ = tokio::signal::ctrl_c(), if !stop_requested => {
                info!("Ctrl-C received; stopping every linked operation");
                stop_all(&ui, &linked);
                stop_requested = true;
            }
        }
    }

    for commanded in linked.iter() {
        commanded.dispose();
    }

    Ok(summary)
}

/// Start the first operation through its command, the rest directly.
///
/// Runs on the ui thread.
fn start_all(linked: &[CommandedRestartableOperation<u32>]) {
    let Some((first, rest)) = linked.split_first() else {
        return;
    };
    first.start_command().execute(&1);

    for commanded in rest {
        if commanded.start_command().can_execute(&1) {
            commanded.start_command().execute(&1);
        } else {
            info!(
                operation = %commanded.operation().name(),
                "start command disabled while a linked operation runs; starting directly"
            );
            commanded.start(1);
        }
    }
}

/// One execute on any stop command cancels every linked operation.
fn stop_all(ui: &DispatchQueue, linked: &Linked) {
    let linked = Arc::clone(linked);
    ui.dispatch(Box::new(move || {
        if let Some(first) = linked.first() {
            if first.stop_command().can_execute(&()) {
                first.stop_command().execute(&());
            }
        }
    }));
}

fn simulate_work(token: &CancellationToken, steps: u32, step: Duration) -> Result<()> {
    for _ in 0..steps {
        Canceled::check(token)?;
        std::thread::sleep(step);
    }
    Ok(())
}
