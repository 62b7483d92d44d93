//! File-backed collaborators.
//!
//! A fixture is one JSON file standing in for every external service:
//!
//! ```json
//! {
//!   "sources": { "direct_1": { "columns": ["Date"], "rows": [{ "Date": "2025-03-03" }] } },
//!   "failures": { "metrika_2": "quota exceeded" },
//!   "integrations": [{ "kind": "direct" }],
//!   "campaigns": [{ "id": 1, "name": "brand" }],
//!   "counters": [],
//!   "catalog_failures": { "counters": "token expired" }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use report_core::{
    Campaign, CampaignCatalog, Counter, CounterCatalog, FetchError, Integration,
    IntegrationDirectory, ProjectId, RawTable, ReportStore, SourceFetcher,
};
use report_model::{DateRange, ReportDefinition, ReportId, Source};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    /// Raw rows per source id.
    pub sources: BTreeMap<String, RawTable>,
    /// Fetch failures per source id.
    pub failures: BTreeMap<String, String>,
    pub integrations: Vec<Integration>,
    pub campaigns: Vec<Campaign>,
    pub counters: Vec<Counter>,
    /// Failures of `integrations`, `campaigns` or `counters`.
    pub catalog_failures: BTreeMap<String, String>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read fixture {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse fixture {}", path.display()))
    }

    fn catalog_failure(&self, service: &str) -> Option<FetchError> {
        self.catalog_failures
            .get(service)
            .map(|message| FetchError::Failed(message.clone()))
    }
}

#[async_trait]
impl SourceFetcher for Fixture {
    async fn fetch(&self, source: &Source, period: DateRange) -> Result<RawTable, FetchError> {
        let id = source.id.as_str();
        debug!(source = id, period = %period, "reading fixture rows");
        if let Some(message) = self.failures.get(id) {
            return Err(FetchError::Failed(message.clone()));
        }
        self.sources
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("no fixture rows for '{id}'")))
    }
}

#[async_trait]
impl IntegrationDirectory for Fixture {
    async fn list_for_project(&self, _: ProjectId) -> Result<Vec<Integration>, FetchError> {
        match self.catalog_failure("integrations") {
            Some(err) => Err(err),
            None => Ok(self.integrations.clone()),
        }
    }
}

#[async_trait]
impl CampaignCatalog for Fixture {
    async fn list(&self, _: ProjectId) -> Result<Vec<Campaign>, FetchError> {
        match self.catalog_failure("campaigns") {
            Some(err) => Err(err),
            None => Ok(self.campaigns.clone()),
        }
    }
}

#[async_trait]
impl CounterCatalog for Fixture {
    async fn list(&self, _: ProjectId) -> Result<Vec<Counter>, FetchError> {
        match self.catalog_failure("counters") {
            Some(err) => Err(err),
            None => Ok(self.counters.clone()),
        }
    }
}

/// A saved report as written by [`JsonFileStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: ReportId,
    pub name: String,
    pub definition: ReportDefinition,
}

/// Saves each report as `report-<id>.json` in one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: ReportId) -> PathBuf {
        self.dir.join(format!("report-{id}.json"))
    }

    fn next_id(&self) -> ReportId {
        let mut id = ReportId(1);
        while self.path_for(id).exists() {
            id = ReportId(id.0 + 1);
        }
        id
    }
}

#[async_trait]
impl ReportStore for JsonFileStore {
    async fn save(&self, name: &str, definition: &ReportDefinition) -> Result<ReportId, FetchError> {
        fs::create_dir_all(&self.dir).map_err(|err| FetchError::Failed(err.to_string()))?;
        let id = self.next_id();
        let stored = StoredReport {
            id,
            name: name.to_string(),
            definition: definition.clone(),
        };
        let text = serde_json::to_string_pretty(&stored)
            .map_err(|err| FetchError::Failed(err.to_string()))?;
        fs::write(self.path_for(id), text).map_err(|err| FetchError::Failed(err.to_string()))?;
        Ok(id)
    }
}
