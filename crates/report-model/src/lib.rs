//! Report definition data model.
//!
//! This crate holds the declarative, serializable description of a report:
//!
//! - **source**: data origins and their local transformation chains
//! - **transform**: the closed set of transformation steps
//! - **period**: period selectors and their resolution to absolute dates
//! - **export**: the destination spreadsheet
//! - **definition**: the top-level [`ReportDefinition`] aggregate
//! - **issue** / **result**: validation and execution output shapes

pub mod definition;
pub mod error;
pub mod export;
pub mod ids;
pub mod issue;
pub mod period;
pub mod result;
pub mod scalar;
pub mod source;
pub mod transform;

pub use definition::ReportDefinition;
pub use error::{ModelError, Result};
pub use export::{DEFAULT_SHEET_NAME, ExportKind, ExportTarget, parse_spreadsheet_id};
pub use ids::{ReportId, SourceId};
pub use issue::{IssueKind, ValidationIssue, ValidationReport};
pub use period::{
    DateRange, FutureDatePolicy, Period, PeriodSelector, PeriodViolation, default_custom_range,
};
pub use result::{DEFAULT_PREVIEW_ROWS, PreviewResult, RunRecord, RunStatus, SourceFailure};
pub use scalar::{Row, Scalar, format_numeric};
pub use source::{
    AdCampaignConfig, CampaignGrouping, CounterConfig, Source, SourceConfig, SourceKind,
};
pub use transform::{
    AggregateFunction, CalculateTransform, ExtractTransform, FilterOperator, FilterTransform,
    GlobalStep, GroupByTransform, JoinHow, JoinTransform, RenameTransform, SortTransform,
    TransformKind, Transformation,
};
