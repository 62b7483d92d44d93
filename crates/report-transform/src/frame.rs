//! Conversion between fetched rows and polars frames.
//!
//! Collaborators hand over rows as column -> [`Scalar`] maps. Each column
//! gets the narrowest dtype that holds all of its non-null values:
//! Boolean, Int64, Float64 (ints and floats mixed), otherwise String.

use polars::prelude::*;
use report_model::{Row, Scalar, format_numeric};

use crate::error::{Result, TransformError};

/// Converts a polars `AnyValue` into a [`Scalar`].
pub fn any_to_scalar(value: AnyValue<'_>) -> Scalar {
    match value {
        AnyValue::Null => Scalar::Null,
        AnyValue::Boolean(b) => Scalar::Bool(b),
        AnyValue::Int8(v) => Scalar::Int(i64::from(v)),
        AnyValue::Int16(v) => Scalar::Int(i64::from(v)),
        AnyValue::Int32(v) => Scalar::Int(i64::from(v)),
        AnyValue::Int64(v) => Scalar::Int(v),
        AnyValue::UInt8(v) => Scalar::Int(i64::from(v)),
        AnyValue::UInt16(v) => Scalar::Int(i64::from(v)),
        AnyValue::UInt32(v) => Scalar::Int(i64::from(v)),
        AnyValue::UInt64(v) => match i64::try_from(v) {
            Ok(v) => Scalar::Int(v),
            Err(_) => Scalar::Float(v as f64),
        },
        AnyValue::Float32(v) => Scalar::Float(f64::from(v)),
        AnyValue::Float64(v) => Scalar::Float(v),
        AnyValue::String(s) => Scalar::Str(s.to_string()),
        AnyValue::StringOwned(s) => Scalar::Str(s.to_string()),
        other => Scalar::Str(other.to_string()),
    }
}

/// Column names in frame order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Borrow a column, mapping a miss to [`TransformError::MissingColumn`].
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| TransformError::MissingColumn(name.to_string()))
}

/// Every cell of `column` as a [`Scalar`].
pub fn column_scalars(column: &Column) -> Result<Vec<Scalar>> {
    (0..column.len())
        .map(|idx| Ok(any_to_scalar(column.get(idx)?)))
        .collect()
}

/// Column order of a row set: `declared` first, then any key seen in the
/// rows that was not declared, in first-seen order.
pub fn row_columns(declared: &[String], rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(declared.len());
    for name in declared {
        if !columns.contains(name) {
            columns.push(name.clone());
        }
    }
    for row in rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Build a frame from rows; a key missing from a row is null.
pub fn frame_from_rows(columns: &[String], rows: &[Row]) -> Result<DataFrame> {
    let null = Scalar::Null;
    let built = columns
        .iter()
        .map(|name| {
            let values: Vec<&Scalar> = rows
                .iter()
                .map(|row| row.get(name).unwrap_or(&null))
                .collect();
            column_from_scalars(name, &values)
        })
        .collect();
    Ok(DataFrame::new(built)?)
}

/// All rows of a frame.
pub fn frame_to_rows(df: &DataFrame) -> Result<Vec<Row>> {
    let names = column_names(df);
    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        columns.push(column_scalars(df.column(name)?)?);
    }

    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut row = Row::new();
        for (name, values) in names.iter().zip(&columns) {
            row.insert(name.clone(), values[idx].clone());
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Stack frames vertically; columns are unioned in first-seen order and
/// cells a frame lacks are null.
pub fn union_frames(frames: &[DataFrame]) -> Result<DataFrame> {
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Row> = Vec::new();
    for frame in frames {
        for name in column_names(frame) {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
        rows.extend(frame_to_rows(frame)?);
    }
    frame_from_rows(&columns, &rows)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inferred {
    Bool,
    Int,
    Float,
    Str,
}

fn infer(values: &[&Scalar]) -> Inferred {
    let mut inferred: Option<Inferred> = None;
    for value in values {
        let next = match value {
            Scalar::Null => continue,
            Scalar::Bool(_) => Inferred::Bool,
            Scalar::Int(_) => Inferred::Int,
            Scalar::Float(_) => Inferred::Float,
            Scalar::Str(_) => return Inferred::Str,
        };
        inferred = Some(match (inferred, next) {
            (None, next) => next,
            (Some(current), next) if current == next => current,
            (Some(Inferred::Int), Inferred::Float) | (Some(Inferred::Float), Inferred::Int) => {
                Inferred::Float
            }
            _ => return Inferred::Str,
        });
    }
    inferred.unwrap_or(Inferred::Str)
}

fn column_from_scalars(name: &str, values: &[&Scalar]) -> Column {
    match infer(values) {
        Inferred::Bool => {
            let cells: Vec<Option<bool>> = values
                .iter()
                .map(|value| match value {
                    Scalar::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), cells)
        }
        Inferred::Int => {
            let cells: Vec<Option<i64>> = values
                .iter()
                .map(|value| match value {
                    Scalar::Int(v) => Some(*v),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), cells)
        }
        Inferred::Float => {
            let cells: Vec<Option<f64>> = values.iter().map(|value| value.as_f64()).collect();
            Column::new(name.into(), cells)
        }
        Inferred::Str => {
            let mut builder = StringChunkedBuilder::new(name.into(), values.len());
            for value in values {
                match value {
                    Scalar::Null => builder.append_null(),
                    Scalar::Str(s) => builder.append_value(s),
                    Scalar::Float(v) => builder.append_value(format_numeric(*v)),
                    other => builder.append_value(other.to_string()),
                }
            }
            Column::from(builder.finish().into_series())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Scalar)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn infers_narrowest_dtype() {
        let rows = vec![
            row(&[("a", Scalar::Int(1)), ("b", Scalar::Int(1)), ("c", "x".into())]),
            row(&[("a", Scalar::Int(2)), ("b", Scalar::Float(2.5)), ("c", Scalar::Int(3))]),
            row(&[("a", Scalar::Null)]),
        ];
        let columns = row_columns(&[], &rows);
        let df = frame_from_rows(&columns, &rows).unwrap();
        assert_eq!(df.column("a").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("b").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("c").unwrap().dtype(), &DataType::String);
        assert_eq!(df.height(), 3);
    }

    #[test]
    fn rows_survive_a_frame_trip() {
        let rows = vec![
            row(&[("name", "alpha".into()), ("clicks", Scalar::Int(3))]),
            row(&[("name", Scalar::Null), ("clicks", Scalar::Int(4))]),
        ];
        let df = frame_from_rows(&["name".into(), "clicks".into()], &rows).unwrap();
        assert_eq!(frame_to_rows(&df).unwrap(), rows);
    }

    #[test]
    fn declared_columns_come_first() {
        let rows = vec![row(&[("z", Scalar::Int(1)), ("a", Scalar::Int(2))])];
        assert_eq!(row_columns(&["z".into()], &rows), vec!["z", "a"]);
    }

    #[test]
    fn union_fills_missing_cells_with_null() {
        let left = frame_from_rows(&["a".into()], &[row(&[("a", Scalar::Int(1))])]).unwrap();
        let right = frame_from_rows(
            &["a".into(), "b".into()],
            &[row(&[("a", Scalar::Int(2)), ("b", "x".into())])],
        )
        .unwrap();
        let union = union_frames(&[left, right]).unwrap();
        assert_eq!(column_names(&union), vec!["a", "b"]);
        let rows = frame_to_rows(&union).unwrap();
        assert_eq!(rows[0]["b"], Scalar::Null);
        assert_eq!(rows[1]["b"], Scalar::from("x"));
    }
}
