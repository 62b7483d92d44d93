//! Executors for each transformation kind.
//!
//! Every executor takes its input frame by value and returns the reshaped
//! frame. Closed-set names (aggregation, join type, operator) are parsed
//! here, so an unknown name fails the step rather than being ignored.

use std::cmp::Ordering;
use std::collections::HashMap;

use polars::prelude::*;
use regex::Regex;
use report_model::{
    AggregateFunction, CalculateTransform, ExtractTransform, FilterOperator, FilterTransform,
    GroupByTransform, JoinHow, JoinTransform, RenameTransform, Row, Scalar, SortTransform,
    format_numeric,
};
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::formula::Formula;
use crate::frame::{
    any_to_scalar, column_names, column_scalars, frame_from_rows, frame_to_rows, require_column,
};

/// Suffix appended to right-hand columns whose name already exists on the left.
pub const JOIN_SUFFIX: &str = "_right";

fn require_field(value: &str, kind: &'static str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TransformError::MissingField { kind, field });
    }
    Ok(())
}

/// Capture the first group of `pattern` (the whole match when the pattern
/// has no group) from `column` into `output_column`.
///
/// Rows that do not match, or whose cell is null, get null.
pub fn apply_extract(mut df: DataFrame, step: &ExtractTransform) -> Result<DataFrame> {
    require_field(&step.output_column, "extract", "output_column")?;
    let regex = Regex::new(&step.pattern).map_err(|source| TransformError::InvalidPattern {
        pattern: step.pattern.clone(),
        source,
    })?;
    let group = usize::from(regex.captures_len() > 1);
    let values = column_scalars(require_column(&df, &step.column)?)?;

    let mut builder = StringChunkedBuilder::new(step.output_column.as_str().into(), df.height());
    let mut matched = 0usize;
    for value in &values {
        if value.is_null() {
            builder.append_null();
            continue;
        }
        let text = value.to_string();
        match regex.captures(&text).and_then(|caps| caps.get(group)) {
            Some(capture) => {
                builder.append_value(capture.as_str());
                matched += 1;
            }
            None => builder.append_null(),
        }
    }

    df.with_column(builder.finish().into_series())?;
    debug!(column = %step.column, matched, rows = values.len(), "extract applied");
    Ok(df)
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn aggregate_expr(column: &str, function: AggregateFunction, numeric: bool) -> Expr {
    let input = if numeric {
        col(column)
    } else {
        col(column).cast(DataType::Float64)
    };
    match function {
        AggregateFunction::Sum => input.sum(),
        AggregateFunction::Avg => input.mean(),
        AggregateFunction::Count => col(column).count(),
        AggregateFunction::Min => col(column).min(),
        AggregateFunction::Max => col(column).max(),
    }
}

/// Group by `columns` and reduce each aggregated column.
///
/// Groups keep first-appearance order. With no grouping columns the whole
/// frame collapses into one row. Columns that are neither keys nor
/// aggregated are dropped. `sum` and `avg` read text columns as numbers.
pub fn apply_group_by(df: DataFrame, step: &GroupByTransform) -> Result<DataFrame> {
    let mut aggs = Vec::with_capacity(step.aggregations.len());
    for (column, function) in &step.aggregations {
        let parsed: AggregateFunction = function
            .parse()
            .map_err(|_| TransformError::UnsupportedAggregation(function.clone()))?;
        let numeric = is_numeric_dtype(require_column(&df, column)?.dtype());
        aggs.push(aggregate_expr(column, parsed, numeric));
    }
    for key in &step.columns {
        require_column(&df, key)?;
    }

    let grouped = if step.columns.is_empty() {
        df.lazy().select(aggs)
    } else {
        let keys: Vec<Expr> = step.columns.iter().map(|key| col(key.as_str())).collect();
        df.lazy().group_by_stable(keys).agg(aggs)
    };
    let out = grouped.collect()?;
    debug!(groups = out.height(), "group_by applied");
    Ok(out)
}

/// Join key of a cell: numbers compare by value, so `1` matches `1.0`.
fn join_key(value: &Scalar) -> Option<String> {
    match value {
        Scalar::Null => None,
        Scalar::Int(_) | Scalar::Float(_) => value.as_f64().map(format_numeric),
        other => Some(other.to_string()),
    }
}

fn key_index(rows: &[Row], on: &str) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        if let Some(key) = row.get(on).and_then(join_key) {
            index.entry(key).or_default().push(idx);
        }
    }
    index
}

struct JoinLayout<'a> {
    on: &'a str,
    left: Vec<String>,
    /// Right-side columns other than `on`, with their output names.
    right: Vec<(String, String)>,
}

impl JoinLayout<'_> {
    fn columns(&self) -> Vec<String> {
        let mut columns = self.left.clone();
        columns.extend(self.right.iter().map(|(_, out)| out.clone()));
        columns
    }

    fn merge(&self, left: Option<&Row>, right: Option<&Row>) -> Row {
        let mut row = Row::new();
        for name in &self.left {
            let value = left.and_then(|l| l.get(name)).cloned().unwrap_or_default();
            row.insert(name.clone(), value);
        }
        if left.is_none() {
            let key = right.and_then(|r| r.get(self.on)).cloned().unwrap_or_default();
            row.insert(self.on.to_string(), key);
        }
        for (name, out) in &self.right {
            let value = right.and_then(|r| r.get(name)).cloned().unwrap_or_default();
            row.insert(out.clone(), value);
        }
        row
    }
}

/// Relational join of two frames on the column `on`.
///
/// The key column appears once, holding whichever side's value is present.
/// Right-hand columns that clash with a left-hand name get [`JOIN_SUFFIX`].
/// Output order follows the preserved side (the left for `left`, `inner` and
/// `outer`, the right for `right`); `outer` appends unmatched right rows
/// at the end. Null keys never match.
pub fn apply_join(left: &DataFrame, right: &DataFrame, step: &JoinTransform) -> Result<DataFrame> {
    require_field(&step.on, "join", "on")?;
    let how: JoinHow = step
        .how
        .parse()
        .map_err(|_| TransformError::UnsupportedJoinType(step.how.clone()))?;
    require_column(left, &step.on)?;
    require_column(right, &step.on)?;

    let left_columns = column_names(left);
    let layout = JoinLayout {
        on: &step.on,
        right: column_names(right)
            .into_iter()
            .filter(|name| *name != step.on)
            .map(|name| {
                let out = if left_columns.contains(&name) {
                    format!("{name}{JOIN_SUFFIX}")
                } else {
                    name.clone()
                };
                (name, out)
            })
            .collect(),
        left: left_columns,
    };

    let left_rows = frame_to_rows(left)?;
    let right_rows = frame_to_rows(right)?;
    let mut rows = Vec::new();

    match how {
        JoinHow::Right => {
            let left_index = key_index(&left_rows, &step.on);
            for right_row in &right_rows {
                let matches = right_row
                    .get(&step.on)
                    .and_then(join_key)
                    .and_then(|key| left_index.get(&key));
                match matches {
                    Some(found) => rows.extend(
                        found
                            .iter()
                            .map(|&idx| layout.merge(Some(&left_rows[idx]), Some(right_row))),
                    ),
                    None => rows.push(layout.merge(None, Some(right_row))),
                }
            }
        }
        JoinHow::Left | JoinHow::Inner | JoinHow::Outer => {
            let right_index = key_index(&right_rows, &step.on);
            let mut right_matched = vec![false; right_rows.len()];
            for left_row in &left_rows {
                let matches = left_row
                    .get(&step.on)
                    .and_then(join_key)
                    .and_then(|key| right_index.get(&key));
                match matches {
                    Some(found) => {
                        for &idx in found {
                            right_matched[idx] = true;
                            rows.push(layout.merge(Some(left_row), Some(&right_rows[idx])));
                        }
                    }
                    None if how != JoinHow::Inner => rows.push(layout.merge(Some(left_row), None)),
                    None => {}
                }
            }
            if how == JoinHow::Outer {
                rows.extend(
                    right_rows
                        .iter()
                        .zip(&right_matched)
                        .filter(|(_, matched)| !**matched)
                        .map(|(right_row, _)| layout.merge(None, Some(right_row))),
                );
            }
        }
    }

    debug!(how = %step.how, rows = rows.len(), "join applied");
    frame_from_rows(&layout.columns(), &rows)
}

/// Rename columns per `mapping` (old -> new), all at once.
pub fn apply_rename(df: DataFrame, step: &RenameTransform) -> Result<DataFrame> {
    for old in step.mapping.keys() {
        require_column(&df, old)?;
    }
    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .map(|column| match step.mapping.get(column.name().as_str()) {
            Some(new) => column.clone().with_name(new.as_str().into()),
            None => column.clone(),
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

fn compare(cell: &Scalar, value: &Scalar) -> Option<Ordering> {
    match (cell.as_f64(), value.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(cell.to_string().cmp(&value.to_string())),
    }
}

/// Whether `cell` satisfies `operator` against `value`.
///
/// Comparisons are numeric when both sides read as numbers and textual
/// otherwise. A null cell only satisfies `is_null`.
pub fn matches_predicate(operator: FilterOperator, cell: &Scalar, value: &Scalar) -> bool {
    match operator {
        FilterOperator::IsNull => cell.is_null(),
        FilterOperator::NotNull => !cell.is_null(),
        _ if cell.is_null() => false,
        FilterOperator::Eq => compare(cell, value) == Some(Ordering::Equal),
        FilterOperator::Ne => compare(cell, value) != Some(Ordering::Equal),
        FilterOperator::Gt => compare(cell, value) == Some(Ordering::Greater),
        FilterOperator::Lt => compare(cell, value) == Some(Ordering::Less),
        FilterOperator::Contains => cell.to_string().contains(&value.to_string()),
    }
}

/// Keep the rows whose `column` satisfies the predicate, in order.
pub fn apply_filter(df: DataFrame, step: &FilterTransform) -> Result<DataFrame> {
    let operator: FilterOperator = step
        .operator
        .parse()
        .map_err(|_| TransformError::UnsupportedOperator(step.operator.clone()))?;
    let cells = column_scalars(require_column(&df, &step.column)?)?;

    let value = if operator.takes_value() {
        match &step.value {
            Some(value) if !value.is_null() => value.clone(),
            _ => {
                return Err(TransformError::MissingFilterValue {
                    column: step.column.clone(),
                });
            }
        }
    } else {
        Scalar::Null
    };

    let mask: Vec<bool> = cells
        .iter()
        .map(|cell| matches_predicate(operator, cell, &value))
        .collect();
    let mask = BooleanChunked::from_slice("mask".into(), &mask);
    let out = df.filter(&mask)?;
    debug!(column = %step.column, kept = out.height(), "filter applied");
    Ok(out)
}

/// Add (or replace) `output_column` with the formula evaluated per row.
pub fn apply_calculate(mut df: DataFrame, step: &CalculateTransform) -> Result<DataFrame> {
    require_field(&step.output_column, "calculate", "output_column")?;
    let formula = Formula::parse(&step.formula)?;

    let mut inputs: HashMap<String, Vec<Option<f64>>> = HashMap::new();
    for name in formula.columns() {
        let values = column_scalars(require_column(&df, name)?)?
            .iter()
            .map(Scalar::as_f64)
            .collect();
        inputs.insert(name.to_string(), values);
    }

    let results: Vec<Option<f64>> = (0..df.height())
        .map(|idx| {
            formula.eval(&|name: &str| inputs.get(name).and_then(|values| values[idx]))
        })
        .collect();
    df.with_column(Column::new(step.output_column.as_str().into(), results))?;
    Ok(df)
}

/// Stable ascending sort by `columns`, nulls last.
pub fn apply_sort(df: DataFrame, step: &SortTransform) -> Result<DataFrame> {
    if step.columns.is_empty() {
        return Ok(df);
    }
    for name in &step.columns {
        require_column(&df, name)?;
    }
    let by: Vec<PlSmallStr> = step
        .columns
        .iter()
        .map(|name| PlSmallStr::from(name.as_str()))
        .collect();
    let options = SortMultipleOptions::default()
        .with_maintain_order(true)
        .with_nulls_last(true);
    Ok(df.sort(by, options)?)
}

/// Cell of `df` at (`column`, `idx`), for tests and diagnostics.
pub fn cell(df: &DataFrame, column: &str, idx: usize) -> Result<Scalar> {
    Ok(any_to_scalar(require_column(df, column)?.get(idx)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_without_group_takes_whole_match() {
        let df = DataFrame::new(vec![Column::new("c".into(), vec!["ab12", "xy"])]).unwrap();
        let step = ExtractTransform {
            source: "t".into(),
            column: "c".into(),
            pattern: r"\d+".into(),
            output_column: "digits".into(),
        };
        let out = apply_extract(df, &step).unwrap();
        assert_eq!(cell(&out, "digits", 0).unwrap(), Scalar::from("12"));
        assert_eq!(cell(&out, "digits", 1).unwrap(), Scalar::Null);
    }

    #[test]
    fn extract_rejects_bad_pattern() {
        let df = DataFrame::new(vec![Column::new("c".into(), vec!["a"])]).unwrap();
        let step = ExtractTransform {
            source: "t".into(),
            column: "c".into(),
            pattern: "(".into(),
            output_column: "o".into(),
        };
        assert!(matches!(
            apply_extract(df, &step),
            Err(TransformError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn predicates_compare_numbers_by_value() {
        assert!(matches_predicate(FilterOperator::Eq, &Scalar::Int(5), &Scalar::from("5.0")));
        assert!(matches_predicate(FilterOperator::Gt, &Scalar::Int(10), &Scalar::Int(9)));
        assert!(matches_predicate(FilterOperator::Lt, &Scalar::from("apple"), &Scalar::from("banana")));
        assert!(matches_predicate(FilterOperator::Contains, &Scalar::from("brand_search"), &Scalar::from("brand")));
        assert!(!matches_predicate(FilterOperator::Ne, &Scalar::Null, &Scalar::Int(1)));
        assert!(matches_predicate(FilterOperator::IsNull, &Scalar::Null, &Scalar::Int(1)));
    }

    #[test]
    fn rename_is_simultaneous() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), vec![1i64]),
            Column::new("b".into(), vec![2i64]),
        ])
        .unwrap();
        let step = RenameTransform {
            source: "t".into(),
            mapping: [("a".to_string(), "b".to_string()), ("b".to_string(), "a".to_string())]
                .into_iter()
                .collect(),
        };
        let out = apply_rename(df, &step).unwrap();
        assert_eq!(column_names(&out), vec!["b", "a"]);
        assert_eq!(cell(&out, "b", 0).unwrap(), Scalar::Int(1));
    }
}
