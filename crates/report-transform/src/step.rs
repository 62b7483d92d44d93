//! Capability view of a transformation: one `apply` per variant.

use polars::prelude::DataFrame;
use report_model::{
    CalculateTransform, ExtractTransform, FilterTransform, GroupByTransform, RenameTransform,
    SortTransform, Transformation,
};

use crate::error::{Result, TransformError};
use crate::executors::{
    apply_calculate, apply_extract, apply_filter, apply_group_by, apply_rename, apply_sort,
};

/// A step that reshapes a single table.
pub trait TableStep {
    fn apply(&self, df: DataFrame) -> Result<DataFrame>;
}

impl TableStep for ExtractTransform {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        apply_extract(df, self)
    }
}

impl TableStep for GroupByTransform {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        apply_group_by(df, self)
    }
}

impl TableStep for RenameTransform {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        apply_rename(df, self)
    }
}

impl TableStep for FilterTransform {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        apply_filter(df, self)
    }
}

impl TableStep for CalculateTransform {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        apply_calculate(df, self)
    }
}

impl TableStep for SortTransform {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        apply_sort(df, self)
    }
}

/// Single-input dispatch. A `join` has two inputs and is rejected here;
/// the global pipeline runs it through [`crate::executors::apply_join`].
impl TableStep for Transformation {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        match self {
            Transformation::Extract(step) => step.apply(df),
            Transformation::GroupBy(step) => step.apply(df),
            Transformation::Rename(step) => step.apply(df),
            Transformation::Filter(step) => step.apply(df),
            Transformation::Calculate(step) => step.apply(df),
            Transformation::Sort(step) => step.apply(df),
            Transformation::Join(_) => Err(TransformError::JoinOutsideGlobal),
        }
    }
}
