//! Builder configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// What removing a source does to global steps that consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Leave dependents in place; validation reports them as dangling.
    #[default]
    KeepDangling,
    /// Remove every global step that can no longer resolve its inputs
    /// because of the removal, transitively.
    Cascade,
    /// Refuse the removal while any global step names the source.
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    pub removal_policy: RemovalPolicy,
    /// Undo steps kept by a session.
    pub history_limit: usize,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            removal_policy: RemovalPolicy::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}
