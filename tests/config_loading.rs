mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::io::Write;
use std::str::FromStr;

use restartable::config::{
    ChainPolicy, CoordinatorConfig, from_toml_str, load_and_validate, load_from_path,
};
use restartable::errors::CoordinatorError;
use restartable::exec::Dispatcher;
use restartable::types::{EnablementPolicy, ExecutorKind};
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn empty_file_uses_defaults() -> TestResult {
    init_tracing();
    let cfg = from_toml_str("")?;

    assert_eq!(cfg.chains.start, ChainPolicy::start_default());
    assert_eq!(cfg.chains.stop, ChainPolicy::stop_default());
    assert!(!cfg.chains.start.execute_all_on_any);
    assert_eq!(cfg.chains.start.enablement, EnablementPolicy::WhenAll);
    assert!(cfg.chains.stop.execute_all_on_any);
    assert_eq!(cfg.chains.stop.enablement, EnablementPolicy::WhenAny);

    assert_eq!(cfg.execution.executor, ExecutorKind::ThreadPool);
    assert_eq!(cfg.execution.thread_name, "restartable-worker");

    let defaults = CoordinatorConfig::default();
    assert_eq!(cfg.demo, defaults.demo);
    assert_eq!(cfg.demo.operations, 3);
    Ok(())
}

#[test]
fn full_file_round_trips_through_disk() -> TestResult {
    init_tracing();
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[chains.start]
execute_all_on_any = true
enablement = "when_this"

[chains.stop]
enablement = "when_all"

[execution]
executor = "dedicated"
thread_name = "crunch"

[demo]
operations = 5
steps = 4
step_ms = 2
restart_after_ms = 10
timeout_ms = 1000
"#
    )?;

    let cfg = load_and_validate(file.path())?;
    assert_eq!(
        cfg.chains.start,
        ChainPolicy::new(true, EnablementPolicy::WhenThis)
    );
    // Unspecified keys inside a present section fall back per key.
    assert_eq!(
        cfg.chains.stop,
        ChainPolicy::new(false, EnablementPolicy::WhenAll)
    );
    assert_eq!(cfg.execution.executor, ExecutorKind::Dedicated);
    assert_eq!(cfg.execution.thread_name, "crunch");
    assert_eq!(cfg.demo.operations, 5);
    assert_eq!(cfg.demo.steps, 4);
    assert_eq!(cfg.demo.step_ms, 2);
    assert_eq!(cfg.demo.restart_after_ms, 10);
    assert_eq!(cfg.demo.timeout_ms, 1000);
    Ok(())
}

#[test]
fn raw_load_skips_validation() -> TestResult {
    init_tracing();
    let mut file = NamedTempFile::new()?;
    writeln!(file, "[demo]\noperations = 0")?;

    let raw = load_from_path(file.path())?;
    assert_eq!(raw.demo.operations, 0);

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, CoordinatorError::ConfigError(_)));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    init_tracing();
    let err = load_and_validate("/definitely/not/here/restartable.toml").unwrap_err();
    assert!(matches!(err, CoordinatorError::IoError(_)));
}

#[test]
fn semantic_errors_are_reported() {
    init_tracing();
    let cases = [
        "[demo]\noperations = 0",
        "[demo]\nsteps = 0",
        "[demo]\nstep_ms = 0",
        "[demo]\nrestart_after_ms = 100\ntimeout_ms = 100",
        "[execution]\nthread_name = \"  \"",
    ];
    for toml in cases {
        let err = from_toml_str(toml).unwrap_err();
        assert!(
            matches!(err, CoordinatorError::ConfigError(_)),
            "expected config error for {toml:?}, got {err:?}"
        );
    }
}

#[test]
fn syntax_and_schema_errors_are_toml_errors() {
    init_tracing();
    let cases = [
        "[demo\noperations = 1",
        "[surprise]\nkey = 1",
        "[demo]\noperationz = 2",
        "[chains.start]\nenablement = \"sometimes\"",
        "[execution]\nexecutor = \"gpu\"",
    ];
    for toml in cases {
        let err = from_toml_str(toml).unwrap_err();
        assert!(
            matches!(err, CoordinatorError::TomlError(_)),
            "expected TOML error for {toml:?}, got {err:?}"
        );
    }
}

#[test]
fn enums_parse_from_strings() {
    assert_eq!(
        EnablementPolicy::from_str("when_all"),
        Ok(EnablementPolicy::WhenAll)
    );
    assert_eq!(
        EnablementPolicy::from_str(" When-Any "),
        Ok(EnablementPolicy::WhenAny)
    );
    assert_eq!(
        EnablementPolicy::from_str("this"),
        Ok(EnablementPolicy::WhenThis)
    );
    assert!(EnablementPolicy::from_str("never").is_err());
    assert_eq!(EnablementPolicy::default(), EnablementPolicy::WhenThis);

    assert_eq!(ExecutorKind::from_str("pool"), Ok(ExecutorKind::ThreadPool));
    assert_eq!(
        ExecutorKind::from_str("thread-pool"),
        Ok(ExecutorKind::ThreadPool)
    );
    assert_eq!(ExecutorKind::from_str("inline"), Ok(ExecutorKind::Inline));
    assert!(ExecutorKind::from_str("gpu").is_err());
}

#[tokio::test]
async fn dispatchers_are_built_for_every_executor_kind() -> TestResult {
    init_tracing();
    for kind in ["thread_pool", "dedicated", "inline"] {
        let cfg = from_toml_str(&format!("[execution]\nexecutor = \"{kind}\""))?;
        let dispatcher = cfg
            .execution
            .build_dispatcher(&tokio::runtime::Handle::current())?;

        let (tx, rx) = tokio::sync::oneshot::channel();
        dispatcher.dispatch(Box::new(move || {
            let _ = tx.send(());
        }));
        tokio::time::timeout(common::WAIT, rx).await??;
    }
    Ok(())
}
