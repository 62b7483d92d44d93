//! Validation issue types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a broken invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    /// Missing or malformed field.
    Validation,
    /// Names a source or step output that does not exist.
    Reference,
    /// Unknown aggregation, join type or filter operator.
    Unsupported,
}

impl IssueKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation => "Validation",
            Self::Reference => "Reference",
            Self::Unsupported => "Unsupported",
        }
    }
}

/// One problem found in a report definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Path of the offending field, e.g. `sources[0].source_transformations[1].column`.
    pub field: String,
    pub message: String,
    pub kind: IssueKind,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            kind,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(IssueKind::Validation, field, message)
    }

    pub fn reference(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(IssueKind::Reference, field, message)
    }

    pub fn unsupported(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(IssueKind::Unsupported, field, message)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every issue found, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|issue| issue.kind == kind).count()
    }

    pub fn has_kind(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|issue| issue.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl IntoIterator for ValidationReport {
    type Item = ValidationIssue;
    type IntoIter = std::vec::IntoIter<ValidationIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}
