//! Transformation engine for report definitions.
//!
//! - **frame**: fetched rows <-> polars `DataFrame`
//! - **executors**: one executor per transformation kind
//! - **step**: the [`TableStep`] capability implemented by each variant
//! - **formula**: the arithmetic language of `calculate`
//! - **pipeline**: local chains and the named-table global pipeline

pub mod error;
pub mod executors;
pub mod formula;
pub mod frame;
pub mod pipeline;
pub mod step;

pub use error::{Result, TransformError};
pub use executors::{
    JOIN_SUFFIX, apply_calculate, apply_extract, apply_filter, apply_group_by, apply_join,
    apply_rename, apply_sort, matches_predicate,
};
pub use formula::Formula;
pub use frame::{
    any_to_scalar, column_names, frame_from_rows, frame_to_rows, row_columns, union_frames,
};
pub use pipeline::{GlobalPipeline, PipelineOutput, SourceTable, apply_local_chain};
pub use step::TableStep;
