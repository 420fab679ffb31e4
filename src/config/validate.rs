// src/config/validate.rs

use crate::config::model::{CoordinatorConfig, RawCoordinatorConfig};
use crate::errors::{CoordinatorError, Result};

impl TryFrom<RawCoordinatorConfig> for CoordinatorConfig {
    type Error = CoordinatorError;

    fn try_from(raw: RawCoordinatorConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(CoordinatorConfig::new_unchecked(
            raw.chains,
            raw.execution,
            raw.demo,
        ))
    }
}

pub fn validate_raw_config(cfg: &RawCoordinatorConfig) -> Result<()> {
    validate_execution(cfg)?;
    validate_demo(cfg)?;
    Ok(())
}

fn validate_execution(cfg: &RawCoordinatorConfig) -> Result<()> {
    // executor is strongly typed and validated during deserialization.
    if cfg.execution.thread_name.trim().is_empty() {
        return Err(CoordinatorError::ConfigError(
            "[execution].thread_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_demo(cfg: &RawCoordinatorConfig) -> Result<()> {
    let demo = &cfg.demo;

    if demo.operations == 0 {
        return Err(CoordinatorError::ConfigError(
            "[demo].operations must be >= 1 (got 0)".to_string(),
        ));
    }
    if demo.steps == 0 {
        return Err(CoordinatorError::ConfigError(
            "[demo].steps must be >= 1 (got 0)".to_string(),
        ));
    }
    if demo.step_ms == 0 {
        return Err(CoordinatorError::ConfigError(
            "[demo].step_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if demo.timeout_ms <= demo.restart_after_ms {
        return Err(CoordinatorError::ConfigError(format!(
            "[demo].timeout_ms ({}) must be greater than restart_after_ms ({})",
            demo.timeout_ms, demo.restart_after_ms
        )));
    }

    Ok(())
}
