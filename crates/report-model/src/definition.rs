use serde::{Deserialize, Serialize};

use crate::export::ExportTarget;
use crate::ids::SourceId;
use crate::period::Period;
use crate::source::Source;
use crate::transform::GlobalStep;

/// The complete, serializable description of a report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub period: Period,
    /// Global chain, applied after every source's local chain.
    #[serde(default, rename = "transformations")]
    pub global_transforms: Vec<GlobalStep>,
    #[serde(default)]
    pub export: ExportTarget,
}

impl ReportDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|source| source.id == id)
    }

    pub fn source_mut(&mut self, id: &str) -> Option<&mut Source> {
        self.sources.iter_mut().find(|source| source.id == id)
    }

    pub fn source_index(&self, id: &str) -> Option<usize> {
        self.sources.iter().position(|source| source.id == id)
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &SourceId> {
        self.sources.iter().map(|source| &source.id)
    }

    /// Indexes of global steps that name `id` as an input.
    pub fn global_dependents(&self, id: &str) -> Vec<usize> {
        self.global_transforms
            .iter()
            .enumerate()
            .filter(|(_, step)| step.transform.references(id))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Highest numeric id suffix in use.
    pub fn max_source_sequence(&self) -> Option<u64> {
        self.sources.iter().filter_map(|source| source.id.sequence()).max()
    }
}
