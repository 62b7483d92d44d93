use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ModelError;
use crate::source::SourceKind;

/// Identifier of a source inside one report definition.
///
/// Generated ids have the form `<kind>_<n>` where `n` comes from a
/// per-session counter, so an id is never handed out twice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidSourceId(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn generate(kind: SourceKind, sequence: u64) -> Self {
        Self(format!("{}_{sequence}", kind.wire_name()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix after the last underscore, if any.
    pub fn sequence(&self) -> Option<u64> {
        let (_, suffix) = self.0.rsplit_once('_')?;
        suffix.parse().ok()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SourceId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SourceId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Identifier assigned by the report store on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub u64);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_and_rejects_blank() {
        assert_eq!(SourceId::new("  direct_1 ").unwrap().as_str(), "direct_1");
        assert!(SourceId::new("   ").is_err());
    }

    #[test]
    fn generated_ids_carry_their_sequence() {
        let id = SourceId::generate(SourceKind::AnalyticsCounter, 12);
        assert_eq!(id.as_str(), "metrika_12");
        assert_eq!(id.sequence(), Some(12));
        assert_eq!(SourceId::new("custom").unwrap().sequence(), None);
    }
}
