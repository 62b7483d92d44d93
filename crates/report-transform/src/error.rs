//! Error types for transformation execution.

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("unsupported aggregation function: {0}")]
    UnsupportedAggregation(String),

    #[error("unsupported join type: {0}")]
    UnsupportedJoinType(String),

    #[error("unsupported filter operator: {0}")]
    UnsupportedOperator(String),

    #[error("column '{0}' not found")]
    MissingColumn(String),

    /// A required step field is blank.
    #[error("{kind} step is missing '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("filter on '{column}' needs a comparison value")]
    MissingFilterValue { column: String },

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid formula {formula:?} at offset {offset}: {message}")]
    InvalidFormula {
        formula: String,
        offset: usize,
        message: String,
    },

    /// A global step names a table that was never produced.
    #[error("unknown input '{0}'")]
    UnknownInput(String),

    #[error("join needs two inputs and can only run in the global chain")]
    JoinOutsideGlobal,

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, TransformError>;
