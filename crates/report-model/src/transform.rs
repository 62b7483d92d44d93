//! Transformation steps.
//!
//! [`Transformation`] is a closed variant type: each kind owns exactly the
//! fields it needs, so a kind change can never leak fields of the previous
//! kind into the serialized shape.
//!
//! Names drawn from a closed set (aggregation functions, join types, filter
//! operators) are kept as written and parsed on use, which lets validation
//! report an unknown name instead of failing to load the definition.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::scalar::Scalar;
use crate::{ModelError, Result};

/// Default pattern offered for new `extract` steps: everything before the
/// first underscore.
pub const DEFAULT_EXTRACT_PATTERN: &str = "^([^_]+)";

/// Transformation kind without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Extract,
    GroupBy,
    Join,
    Rename,
    Filter,
    Calculate,
    Sort,
}

impl TransformKind {
    pub const ALL: [TransformKind; 7] = [
        Self::Extract,
        Self::GroupBy,
        Self::Join,
        Self::Rename,
        Self::Filter,
        Self::Calculate,
        Self::Sort,
    ];

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::GroupBy => "group_by",
            Self::Join => "join",
            Self::Rename => "rename",
            Self::Filter => "filter",
            Self::Calculate => "calculate",
            Self::Sort => "sort",
        }
    }

    /// `join` has two inputs and can only appear in the global chain.
    pub const fn is_global_only(self) -> bool {
        matches!(self, Self::Join)
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for TransformKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.wire_name() == wanted)
            .ok_or_else(|| ModelError::UnknownTransformKind(s.to_string()))
    }
}

/// `group_by` reducers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl FromStr for AggregateFunction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "avg" => Ok(Self::Avg),
            "count" => Ok(Self::Count),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            _ => Err(ModelError::UnsupportedAggregation(s.to_string())),
        }
    }
}

/// `join` flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinHow {
    Left,
    Right,
    Inner,
    Outer,
}

impl FromStr for JoinHow {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "inner" => Ok(Self::Inner),
            "outer" => Ok(Self::Outer),
            _ => Err(ModelError::UnsupportedJoinType(s.to_string())),
        }
    }
}

/// `filter` predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Contains,
    IsNull,
    NotNull,
}

impl FilterOperator {
    /// Null checks ignore any supplied value.
    pub const fn takes_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::NotNull)
    }
}

impl FromStr for FilterOperator {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "contains" => Ok(Self::Contains),
            "is_null" => Ok(Self::IsNull),
            "not_null" => Ok(Self::NotNull),
            _ => Err(ModelError::UnsupportedOperator(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractTransform {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub output_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupByTransform {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub columns: Vec<String>,
    /// Column -> aggregation function name.
    #[serde(default)]
    pub aggregations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTransform {
    #[serde(default)]
    pub left: String,
    #[serde(default)]
    pub right: String,
    #[serde(default)]
    pub on: String,
    #[serde(default = "default_join_how")]
    pub how: String,
}

fn default_join_how() -> String {
    "left".to_string()
}

impl Default for JoinTransform {
    fn default() -> Self {
        Self {
            left: String::new(),
            right: String::new(),
            on: String::new(),
            how: default_join_how(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenameTransform {
    #[serde(default)]
    pub source: String,
    /// Old column name -> new column name.
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterTransform {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub column: String,
    #[serde(default = "default_filter_operator")]
    pub operator: String,
    /// Comparison operand; absent for null checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Scalar>,
}

fn default_filter_operator() -> String {
    "eq".to_string()
}

impl Default for FilterTransform {
    fn default() -> Self {
        Self {
            source: String::new(),
            column: String::new(),
            operator: default_filter_operator(),
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CalculateTransform {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub output_column: String,
    #[serde(default)]
    pub formula: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortTransform {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// One reshaping step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transformation {
    Extract(ExtractTransform),
    GroupBy(GroupByTransform),
    Join(JoinTransform),
    Rename(RenameTransform),
    Filter(FilterTransform),
    Calculate(CalculateTransform),
    Sort(SortTransform),
}

impl Transformation {
    /// New step of `kind` with the builder's defaults.
    ///
    /// `primary` becomes `source` (or `left` for joins); `secondary` is only
    /// used as the join's `right`.
    pub fn template(kind: TransformKind, primary: Option<&str>, secondary: Option<&str>) -> Self {
        let source = primary.unwrap_or_default().to_string();
        match kind {
            TransformKind::Extract => Self::Extract(ExtractTransform {
                source,
                pattern: DEFAULT_EXTRACT_PATTERN.to_string(),
                ..Default::default()
            }),
            TransformKind::GroupBy => Self::GroupBy(GroupByTransform {
                source,
                ..Default::default()
            }),
            TransformKind::Join => Self::Join(JoinTransform {
                left: source,
                right: secondary.unwrap_or_default().to_string(),
                ..Default::default()
            }),
            TransformKind::Rename => Self::Rename(RenameTransform {
                source,
                ..Default::default()
            }),
            TransformKind::Filter => Self::Filter(FilterTransform {
                source,
                ..Default::default()
            }),
            TransformKind::Calculate => Self::Calculate(CalculateTransform {
                source,
                ..Default::default()
            }),
            TransformKind::Sort => Self::Sort(SortTransform {
                source,
                ..Default::default()
            }),
        }
    }

    pub fn kind(&self) -> TransformKind {
        match self {
            Self::Extract(_) => TransformKind::Extract,
            Self::GroupBy(_) => TransformKind::GroupBy,
            Self::Join(_) => TransformKind::Join,
            Self::Rename(_) => TransformKind::Rename,
            Self::Filter(_) => TransformKind::Filter,
            Self::Calculate(_) => TransformKind::Calculate,
            Self::Sort(_) => TransformKind::Sort,
        }
    }

    /// Named inputs with the field that holds each one.
    pub fn inputs(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Join(join) => vec![("left", join.left.as_str()), ("right", join.right.as_str())],
            Self::Extract(t) => vec![("source", t.source.as_str())],
            Self::GroupBy(t) => vec![("source", t.source.as_str())],
            Self::Rename(t) => vec![("source", t.source.as_str())],
            Self::Filter(t) => vec![("source", t.source.as_str())],
            Self::Calculate(t) => vec![("source", t.source.as_str())],
            Self::Sort(t) => vec![("source", t.source.as_str())],
        }
    }

    /// `source`, or `left` for a join.
    pub fn primary_input(&self) -> &str {
        match self {
            Self::Join(join) => &join.left,
            Self::Extract(t) => &t.source,
            Self::GroupBy(t) => &t.source,
            Self::Rename(t) => &t.source,
            Self::Filter(t) => &t.source,
            Self::Calculate(t) => &t.source,
            Self::Sort(t) => &t.source,
        }
    }

    /// Point the single-input `source` at `name`. Joins are left untouched.
    pub fn set_source(&mut self, name: &str) {
        let slot = match self {
            Self::Join(_) => return,
            Self::Extract(t) => &mut t.source,
            Self::GroupBy(t) => &mut t.source,
            Self::Rename(t) => &mut t.source,
            Self::Filter(t) => &mut t.source,
            Self::Calculate(t) => &mut t.source,
            Self::Sort(t) => &mut t.source,
        };
        *slot = name.to_string();
    }

    pub fn references(&self, name: &str) -> bool {
        self.inputs().iter().any(|(_, input)| *input == name)
    }
}

/// A step of the global chain together with the name of the table it
/// produces.
///
/// When `output` is unset a single-input step writes back to its `source`
/// and a join writes to its `left` input, so later steps can keep addressing
/// the same name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStep {
    #[serde(flatten)]
    pub transform: Transformation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl GlobalStep {
    pub fn new(transform: Transformation) -> Self {
        Self {
            transform,
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn output_name(&self) -> &str {
        match self.output.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => self.transform.primary_input(),
        }
    }
}

impl From<Transformation> for GlobalStep {
    fn from(transform: Transformation) -> Self {
        Self::new(transform)
    }
}
