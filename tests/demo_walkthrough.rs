mod common;
use crate::common::init_tracing;

use std::error::Error;

use restartable::config::from_toml_str;
use restartable::demo::run_demo;
use restartable::types::CompletionStatus;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_supersedes_first_run_and_everything_ends_on_ui_thread() -> TestResult {
    init_tracing();
    let cfg = from_toml_str(
        r#"
[demo]
operations = 2
steps = 50
step_ms = 5
restart_after_ms = 30
timeout_ms = 5000
"#,
    )?;

    let summary = run_demo(&cfg).await?;

    // Two first runs plus the restart of work-1.
    assert_eq!(summary.total(), 3);
    assert!(
        summary
            .runs
            .values()
            .flatten()
            .all(|report| report.on_ui_thread)
    );

    let first = &summary.runs["work-1"];
    assert_eq!(first.len(), 2);
    let superseded = first.iter().find(|r| r.run == 1).expect("run 1 reported");
    let restarted = first.iter().find(|r| r.run == 2).expect("run 2 reported");
    assert_eq!(superseded.status, CompletionStatus::Canceled);
    assert_eq!(restarted.status, CompletionStatus::Completed);

    let second = &summary.runs["work-2"];
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].status, CompletionStatus::Completed);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_stops_every_operation_through_the_stop_chain() -> TestResult {
    init_tracing();
    let cfg = from_toml_str(
        r#"
[execution]
executor = "dedicated"

[demo]
operations = 3
steps = 10000
step_ms = 1
restart_after_ms = 10
timeout_ms = 100
"#,
    )?;

    let summary = run_demo(&cfg).await?;

    assert_eq!(summary.total(), 4);
    assert!(
        summary
            .runs
            .values()
            .flatten()
            .all(|report| report.status == CompletionStatus::Canceled)
    );
    Ok(())
}
