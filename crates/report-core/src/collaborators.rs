//! Contracts of the external services a report depends on.
//!
//! Integrations, catalogs, raw-data fetching and persistence all live
//! outside this workspace. The executor only sees them through these traits,
//! which keeps it testable with in-memory fakes.

use async_trait::async_trait;
use report_model::{DateRange, ReportDefinition, ReportId, Row, Source, SourceKind};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

pub type ProjectId = u64;

/// A connected external account that enables one source kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    pub kind: SourceKind,
    #[serde(default)]
    pub account: Option<String>,
}

/// Advertising campaign offered in the source field picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: u64,
    pub name: String,
}

/// Analytics counter offered in the source field picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub site: Option<String>,
}

/// Raw rows returned for one source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTable {
    /// Declared column order; keys only found in rows are appended.
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }
}

#[async_trait]
pub trait IntegrationDirectory: Send + Sync {
    async fn list_for_project(&self, project_id: ProjectId) -> Result<Vec<Integration>, FetchError>;
}

#[async_trait]
pub trait CampaignCatalog: Send + Sync {
    async fn list(&self, project_id: ProjectId) -> Result<Vec<Campaign>, FetchError>;
}

#[async_trait]
pub trait CounterCatalog: Send + Sync {
    async fn list(&self, project_id: ProjectId) -> Result<Vec<Counter>, FetchError>;
}

/// Fetches the raw rows of one source for an absolute date range.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &Source, period: DateRange) -> Result<RawTable, FetchError>;
}

/// Persists a validated definition.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn save(&self, name: &str, definition: &ReportDefinition) -> Result<ReportId, FetchError>;
}
