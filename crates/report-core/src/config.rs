//! Execution settings.

use std::time::Duration;

use report_model::{DEFAULT_PREVIEW_ROWS, FutureDatePolicy};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PREVIEW_TIMEOUT_MS: u64 = 30_000;

/// How previews and runs are bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Rows returned by a preview; `row_count` still reports the full size.
    pub preview_row_limit: usize,
    pub preview_timeout_ms: u64,
    pub future_dates: FutureDatePolicy,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            preview_row_limit: DEFAULT_PREVIEW_ROWS,
            preview_timeout_ms: DEFAULT_PREVIEW_TIMEOUT_MS,
            future_dates: FutureDatePolicy::default(),
        }
    }
}

impl ExecutionOptions {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn preview_timeout(&self) -> Duration {
        Duration::from_millis(self.preview_timeout_ms)
    }
}
