//! Errors raised while executing or saving a report.

use report_model::{ModelError, SourceFailure, ValidationReport};
use report_transform::TransformError;
use thiserror::Error;
use tokio::task::JoinError;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Failed(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The definition was rejected before anything was fetched.
    #[error("report definition is invalid: {0}")]
    Invalid(ValidationReport),

    #[error("preview timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("all {} sources failed to fetch", .0.len())]
    AllSourcesFailed(Vec<SourceFailure>),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Period(#[from] ModelError),

    /// A transformation task on the blocking pool panicked or was cancelled.
    #[error("transformation task failed: {0}")]
    Task(#[from] JoinError),

    #[error("failed to save report: {0}")]
    Store(#[source] FetchError),
}

impl ExecutionError {
    /// Whether running the same request again may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The validation report, when the definition was rejected.
    pub fn validation_report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Invalid(report) => Some(report),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
