// src/errors.rs

//! Crate-wide error types.
//!
//! - [`CoordinatorError`] covers construction-time and configuration failures.
//!   These are returned to the caller directly.
//! - [`Canceled`] is the marker a unit of work returns when it observed its
//!   cancellation token. The coordinator classifies it as a canceled outcome
//!   instead of a fault.
//! - [`WorkPanicked`] wraps a panic payload captured from a unit of work.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoordinatorError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        CoordinatorError::InvalidArgument(msg.into())
    }
}

/// Returned by a unit of work that stopped because its token was cancelled.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("operation was canceled")]
pub struct Canceled;

impl Canceled {
    /// `Err(Canceled)` once `token` has been cancelled.
    ///
    /// Work loops call this between steps and bubble it up with `?`.
    pub fn check(token: &CancellationToken) -> std::result::Result<(), Canceled> {
        if token.is_cancelled() {
            Err(Canceled)
        } else {
            Ok(())
        }
    }
}

/// A unit of work panicked instead of returning.
#[derive(Error, Debug, Clone)]
#[error("unit of work panicked: {message}")]
pub struct WorkPanicked {
    pub message: String,
}

impl WorkPanicked {
    pub(crate) fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CoordinatorError>;
