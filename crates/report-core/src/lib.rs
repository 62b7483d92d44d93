//! Report execution.
//!
//! - **collaborators**: async contracts of the external services
//! - **catalog**: what a project can build from, degrading per source kind
//! - **executor**: preview, run and save over a validated definition
//! - **clock** / **config**: injected time and execution bounds

pub mod catalog;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod executor;

pub use catalog::{CatalogSnapshot, load_catalogs};
pub use clock::{Clock, FixedClock, SystemClock};
pub use collaborators::{
    Campaign, CampaignCatalog, Counter, CounterCatalog, Integration, IntegrationDirectory,
    ProjectId, RawTable, ReportStore, SourceFetcher,
};
pub use config::{DEFAULT_PREVIEW_TIMEOUT_MS, ExecutionOptions};
pub use error::{ExecutionError, FetchError, Result};
pub use executor::{ReportExecutor, ReportRun};
