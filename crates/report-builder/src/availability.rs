//! Which source kinds a project can use, as loaded from its catalogs.

use std::collections::BTreeSet;

use report_model::SourceKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceAvailability {
    kinds: BTreeSet<SourceKind>,
    /// Known analytics counters, in catalog order.
    #[serde(default)]
    counters: Vec<u64>,
}

impl SourceAvailability {
    /// Every kind available, no counters known.
    pub fn all() -> Self {
        Self {
            kinds: SourceKind::ALL.into_iter().collect(),
            counters: Vec::new(),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, kind: SourceKind) {
        self.kinds.insert(kind);
    }

    pub fn disable(&mut self, kind: SourceKind) {
        self.kinds.remove(&kind);
    }

    pub fn with_counters(mut self, counters: Vec<u64>) -> Self {
        self.counters = counters;
        self
    }

    pub fn is_available(&self, kind: SourceKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = SourceKind> + '_ {
        self.kinds.iter().copied()
    }

    /// Counter preselected for new analytics sources.
    pub fn default_counter(&self) -> Option<u64> {
        self.counters.first().copied()
    }

    pub fn counters(&self) -> &[u64] {
        &self.counters
    }
}
