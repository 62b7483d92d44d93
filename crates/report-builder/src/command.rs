//! Builder commands and partial updates.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use report_model::{
    CampaignGrouping, ExportTarget, PeriodSelector, Scalar, SourceKind, TransformKind,
};

/// One edit to a report definition.
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderCommand {
    AddSource {
        kind: SourceKind,
    },
    UpdateSource {
        id: String,
        patch: SourcePatch,
    },
    RemoveSource {
        id: String,
    },
    AddLocalTransform {
        source_id: String,
        kind: TransformKind,
    },
    UpdateLocalTransform {
        source_id: String,
        index: usize,
        patch: TransformPatch,
    },
    RemoveLocalTransform {
        source_id: String,
        index: usize,
    },
    AddGlobalTransform {
        kind: TransformKind,
    },
    UpdateGlobalTransform {
        index: usize,
        patch: TransformPatch,
    },
    RemoveGlobalTransform {
        index: usize,
    },
    SetPeriod {
        selector: PeriodSelector,
        custom_range: Option<(NaiveDate, NaiveDate)>,
    },
    SetExport(ExportTarget),
    SetName(String),
}

impl BuilderCommand {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddSource { .. } => "add_source",
            Self::UpdateSource { .. } => "update_source",
            Self::RemoveSource { .. } => "remove_source",
            Self::AddLocalTransform { .. } => "add_local_transform",
            Self::UpdateLocalTransform { .. } => "update_local_transform",
            Self::RemoveLocalTransform { .. } => "remove_local_transform",
            Self::AddGlobalTransform { .. } => "add_global_transform",
            Self::UpdateGlobalTransform { .. } => "update_global_transform",
            Self::RemoveGlobalTransform { .. } => "remove_global_transform",
            Self::SetPeriod { .. } => "set_period",
            Self::SetExport(_) => "set_export",
            Self::SetName(_) => "set_name",
        }
    }
}

/// Fields to merge into an ad-campaign source. `None` leaves a field as is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdCampaignPatch {
    pub campaign_ids: Option<Vec<u64>>,
    pub fields: Option<Vec<String>>,
    pub group_by: Option<CampaignGrouping>,
}

/// Fields to merge into an analytics-counter source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CounterPatch {
    pub counter_id: Option<u64>,
    pub goals: Option<Vec<u64>>,
    pub metrics: Option<Vec<String>>,
    pub dimensions: Option<Vec<String>>,
}

/// Partial source update; the variant must match the source's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePatch {
    AdCampaigns(AdCampaignPatch),
    AnalyticsCounter(CounterPatch),
}

impl SourcePatch {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::AdCampaigns(_) => SourceKind::AdCampaigns,
            Self::AnalyticsCounter(_) => SourceKind::AnalyticsCounter,
        }
    }
}

/// Partial transformation update.
///
/// Setting `kind` to a different kind replaces the step with a fresh template
/// of that kind (keeping its primary input) before the other fields are
/// merged; fields of the previous kind are dropped. Setting a field the
/// resulting kind does not have is an error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformPatch {
    pub kind: Option<TransformKind>,
    pub source: Option<String>,
    pub column: Option<String>,
    pub pattern: Option<String>,
    pub output_column: Option<String>,
    pub columns: Option<Vec<String>>,
    pub aggregations: Option<BTreeMap<String, String>>,
    pub left: Option<String>,
    pub right: Option<String>,
    pub on: Option<String>,
    pub how: Option<String>,
    pub mapping: Option<BTreeMap<String, String>>,
    pub operator: Option<String>,
    /// `Some(Scalar::Null)` clears the value.
    pub value: Option<Scalar>,
    pub formula: Option<String>,
    /// Output name of a global step; blank clears it.
    pub output: Option<String>,
}

impl TransformPatch {
    pub fn change_kind(kind: TransformKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }
}
