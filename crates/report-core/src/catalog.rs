//! Loading what a project can build reports from.
//!
//! A failing catalog never blocks the builder: the affected source kind is
//! disabled and a warning is recorded.

use report_builder::SourceAvailability;
use report_model::SourceKind;
use tracing::{info, warn};

use crate::collaborators::{
    Campaign, CampaignCatalog, Counter, CounterCatalog, IntegrationDirectory, ProjectId,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogSnapshot {
    pub availability: SourceAvailability,
    pub campaigns: Vec<Campaign>,
    pub counters: Vec<Counter>,
    /// One line per degraded service.
    pub warnings: Vec<String>,
}

pub async fn load_catalogs(
    project_id: ProjectId,
    directory: &dyn IntegrationDirectory,
    campaign_catalog: &dyn CampaignCatalog,
    counter_catalog: &dyn CounterCatalog,
) -> CatalogSnapshot {
    let mut snapshot = CatalogSnapshot {
        availability: SourceAvailability::none(),
        ..Default::default()
    };

    match directory.list_for_project(project_id).await {
        Ok(integrations) => {
            for integration in &integrations {
                snapshot.availability.enable(integration.kind);
            }
        }
        Err(err) => {
            warn!(project_id, error = %err, "integration directory unavailable");
            snapshot
                .warnings
                .push(format!("integrations could not be loaded: {err}"));
            return snapshot;
        }
    }

    let wants_campaigns = snapshot.availability.is_available(SourceKind::AdCampaigns);
    let wants_counters = snapshot
        .availability
        .is_available(SourceKind::AnalyticsCounter);
    let (campaigns, counters) = futures::join!(
        async {
            if wants_campaigns {
                Some(campaign_catalog.list(project_id).await)
            } else {
                None
            }
        },
        async {
            if wants_counters {
                Some(counter_catalog.list(project_id).await)
            } else {
                None
            }
        },
    );

    match campaigns {
        Some(Ok(campaigns)) => snapshot.campaigns = campaigns,
        Some(Err(err)) => degrade(&mut snapshot, SourceKind::AdCampaigns, &err.to_string()),
        None => {}
    }
    match counters {
        Some(Ok(counters)) => {
            let ids = counters.iter().map(|counter| counter.id).collect();
            snapshot.availability = snapshot.availability.with_counters(ids);
            snapshot.counters = counters;
        }
        Some(Err(err)) => degrade(&mut snapshot, SourceKind::AnalyticsCounter, &err.to_string()),
        None => {}
    }

    info!(
        project_id,
        kinds = snapshot.availability.kinds().count(),
        campaigns = snapshot.campaigns.len(),
        counters = snapshot.counters.len(),
        "catalogs loaded"
    );
    snapshot
}

fn degrade(snapshot: &mut CatalogSnapshot, kind: SourceKind, message: &str) {
    warn!(kind = %kind, error = message, "catalog unavailable, disabling source kind");
    snapshot.availability.disable(kind);
    snapshot
        .warnings
        .push(format!("{} catalog could not be loaded: {message}", kind.label()));
}
