//! Export destination of a report.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SHEET_NAME: &str = "Report";

/// `/spreadsheets/d/<id>` inside a Google Sheets URL.
static SPREADSHEET_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").expect("Invalid spreadsheet URL regex")
});

/// Extract the spreadsheet id from a full URL, or return the trimmed input
/// unchanged when it does not look like one.
///
/// Applying it to its own output is a no-op.
///
/// ```
/// use report_model::parse_spreadsheet_id;
///
/// assert_eq!(
///     parse_spreadsheet_id("https://docs.google.com/spreadsheets/d/1AbC-d_9/edit#gid=0"),
///     "1AbC-d_9"
/// );
/// assert_eq!(parse_spreadsheet_id(" abc123 "), "abc123");
/// ```
pub fn parse_spreadsheet_id(url_or_id: &str) -> String {
    let trimmed = url_or_id.trim();
    SPREADSHEET_URL_REGEX
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| trimmed.to_string(), |m| m.as_str().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    #[default]
    GoogleSheets,
}

/// Destination spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTarget {
    #[serde(rename = "type", default)]
    pub kind: ExportKind,
    #[serde(default)]
    pub create_new: bool,
    /// Bare id or full URL; required unless `create_new`.
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub sheet_name: String,
}

impl Default for ExportTarget {
    fn default() -> Self {
        Self {
            kind: ExportKind::GoogleSheets,
            create_new: false,
            spreadsheet_id: None,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

impl ExportTarget {
    /// Write into an existing spreadsheet, given its id or URL.
    pub fn existing(url_or_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: Some(url_or_id.into()),
            sheet_name: sheet_name.into(),
            ..Default::default()
        }
    }

    /// Create a fresh spreadsheet on export.
    pub fn new_spreadsheet(sheet_name: impl Into<String>) -> Self {
        Self {
            create_new: true,
            sheet_name: sheet_name.into(),
            ..Default::default()
        }
    }

    /// Parsed spreadsheet id, `None` when creating a new one or blank.
    pub fn resolved_spreadsheet_id(&self) -> Option<String> {
        if self.create_new {
            return None;
        }
        self.spreadsheet_id
            .as_deref()
            .map(parse_spreadsheet_id)
            .filter(|id| !id.is_empty())
    }

    pub fn effective_sheet_name(&self) -> &str {
        let trimmed = self.sheet_name.trim();
        if trimmed.is_empty() {
            DEFAULT_SHEET_NAME
        } else {
            trimmed
        }
    }

    /// Submission form: id parsed from a URL, default sheet name applied,
    /// id dropped when a new spreadsheet is created.
    pub fn normalized(&self) -> Self {
        Self {
            kind: self.kind,
            create_new: self.create_new,
            spreadsheet_id: self.resolved_spreadsheet_id(),
            sheet_name: self.effective_sheet_name().to_string(),
        }
    }

    /// Whether the target names a destination at all.
    pub fn is_addressable(&self) -> bool {
        self.create_new || self.resolved_spreadsheet_id().is_some()
    }
}
