//! Shapes returned by report execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::period::DateRange;
use crate::scalar::Row;

/// Rows shown by a preview.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// A source whose raw-data fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: String,
    pub message: String,
}

/// Tabular execution output.
///
/// `row_count` is the size of the full result even when `data` was
/// truncated for a preview.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreviewResult {
    pub columns: Vec<String>,
    pub data: Vec<Row>,
    pub row_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<DateRange>,
    /// Sources that failed to fetch; their dependent steps were skipped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_errors: Vec<SourceFailure>,
    /// Global steps skipped because an input was unavailable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_steps: Vec<usize>,
}

impl PreviewResult {
    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.row_count
    }

    pub fn is_partial(&self) -> bool {
        !self.source_errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    /// Completed, but some sources failed to fetch.
    Partial,
    Failed,
}

/// Bookkeeping for one full run of a saved report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub row_count: Option<usize>,
}

impl RunRecord {
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Running,
            started_at: at,
            completed_at: None,
            error_message: None,
            row_count: None,
        }
    }

    pub fn complete(mut self, at: DateTime<Utc>, row_count: usize, partial: bool) -> Self {
        self.status = if partial {
            RunStatus::Partial
        } else {
            RunStatus::Completed
        };
        self.completed_at = Some(at);
        self.row_count = Some(row_count);
        self
    }

    pub fn fail(mut self, at: DateTime<Utc>, message: impl Into<String>) -> Self {
        self.status = RunStatus::Failed;
        self.completed_at = Some(at);
        self.error_message = Some(message.into());
        self
    }
}
