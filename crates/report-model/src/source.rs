//! Data sources bound into a report.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::SourceId;
use crate::transform::Transformation;
use crate::{ModelError, Result};

/// Campaign report fields the ad platform accepts in a projection.
pub const CAMPAIGN_FIELD_WHITELIST: &[&str] = &[
    "CampaignId",
    "CampaignName",
    "Date",
    "Impressions",
    "Clicks",
    "Cost",
    "Ctr",
    "AvgCpc",
    "Conversions",
    "ConversionRate",
    "CostPerConversion",
];

/// Projection used when none (or nothing valid) was selected.
pub const DEFAULT_CAMPAIGN_FIELDS: &[&str] = &[
    "CampaignId",
    "CampaignName",
    "Impressions",
    "Clicks",
    "Cost",
    "Ctr",
    "AvgCpc",
    "Conversions",
    "ConversionRate",
    "CostPerConversion",
];

pub const DEFAULT_COUNTER_METRICS: &[&str] = &["ym:s:visits", "ym:s:users", "ym:s:bounceRate"];

pub const DEFAULT_COUNTER_DIMENSIONS: &[&str] = &["ym:s:UTMSource", "ym:s:UTMCampaign"];

/// Kind of data origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Ad-platform campaign statistics.
    #[serde(rename = "direct", alias = "ad_campaigns")]
    AdCampaigns,
    /// Web-analytics counter statistics.
    #[serde(rename = "metrika", alias = "analytics_counter")]
    AnalyticsCounter,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [Self::AdCampaigns, Self::AnalyticsCounter];

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::AdCampaigns => "direct",
            Self::AnalyticsCounter => "metrika",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::AdCampaigns => "Ad campaigns",
            Self::AnalyticsCounter => "Analytics counter",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for SourceKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "ad_campaigns" => Ok(Self::AdCampaigns),
            "metrika" | "analytics_counter" => Ok(Self::AnalyticsCounter),
            _ => Err(ModelError::UnknownSourceKind(s.to_string())),
        }
    }
}

/// Row granularity of campaign statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignGrouping {
    /// One row per campaign for the whole period.
    #[default]
    Campaign,
    /// One row per campaign and day.
    Day,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdCampaignConfig {
    /// Campaign allow-list; empty means all campaigns.
    #[serde(default)]
    pub campaign_ids: Vec<u64>,
    /// Requested projection; empty means the default set.
    #[serde(default, alias = "direct_fields")]
    pub fields: Vec<String>,
    #[serde(default, alias = "direct_group_by")]
    pub group_by: CampaignGrouping,
}

impl AdCampaignConfig {
    /// Projection actually requested from the platform.
    ///
    /// Unknown names are dropped; an empty result falls back to
    /// [`DEFAULT_CAMPAIGN_FIELDS`]. Daily grouping forces `Date` first.
    pub fn effective_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self
            .fields
            .iter()
            .filter(|field| CAMPAIGN_FIELD_WHITELIST.contains(&field.as_str()))
            .cloned()
            .collect();
        if fields.is_empty() {
            fields = DEFAULT_CAMPAIGN_FIELDS.iter().map(|f| f.to_string()).collect();
        }
        if self.group_by == CampaignGrouping::Day && !fields.iter().any(|f| f == "Date") {
            fields.insert(0, "Date".to_string());
        }
        fields
    }

    /// Requested fields that are not in the whitelist.
    pub fn unknown_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(String::as_str)
            .filter(|field| !CAMPAIGN_FIELD_WHITELIST.contains(field))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterConfig {
    #[serde(default)]
    pub counter_id: Option<u64>,
    #[serde(default)]
    pub goals: Vec<u64>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
}

impl CounterConfig {
    /// Config with the default metric and dimension sets.
    pub fn with_defaults(counter_id: Option<u64>) -> Self {
        Self {
            counter_id,
            goals: Vec::new(),
            metrics: DEFAULT_COUNTER_METRICS.iter().map(|m| m.to_string()).collect(),
            dimensions: DEFAULT_COUNTER_DIMENSIONS
                .iter()
                .map(|d| d.to_string())
                .collect(),
        }
    }

    pub fn effective_metrics(&self) -> Vec<String> {
        if self.metrics.is_empty() {
            DEFAULT_COUNTER_METRICS.iter().map(|m| m.to_string()).collect()
        } else {
            self.metrics.clone()
        }
    }

    pub fn effective_dimensions(&self) -> Vec<String> {
        if self.dimensions.is_empty() {
            DEFAULT_COUNTER_DIMENSIONS
                .iter()
                .map(|d| d.to_string())
                .collect()
        } else {
            self.dimensions.clone()
        }
    }
}

/// Kind-specific settings; the tag is the source `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SourceConfig {
    #[serde(rename = "direct", alias = "ad_campaigns")]
    AdCampaigns(AdCampaignConfig),
    #[serde(rename = "metrika", alias = "analytics_counter")]
    AnalyticsCounter(CounterConfig),
}

impl SourceConfig {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::AdCampaigns(_) => SourceKind::AdCampaigns,
            Self::AnalyticsCounter(_) => SourceKind::AnalyticsCounter,
        }
    }
}

/// One data origin bound into a report, with its private transform chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    #[serde(flatten)]
    pub config: SourceConfig,
    /// Applied to this source's raw rows before any cross-source step.
    #[serde(default, rename = "source_transformations")]
    pub transforms: Vec<Transformation>,
}

impl Source {
    pub fn new(id: SourceId, config: SourceConfig) -> Self {
        Self {
            id,
            config,
            transforms: Vec::new(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.config.kind()
    }
}
