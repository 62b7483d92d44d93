//! Pure `(state, command) -> state` reducer.
//!
//! [`reduce`] never mutates its input: it returns a new state or an error,
//! which is what lets [`crate::BuilderSession`] keep whole states on its
//! undo and redo stacks.

use std::collections::HashSet;

use report_model::{
    AdCampaignConfig, CounterConfig, GlobalStep, Period, ReportDefinition, Scalar, Source,
    SourceConfig, SourceId, SourceKind, TransformKind, Transformation,
};
use tracing::debug;

use crate::availability::SourceAvailability;
use crate::command::{AdCampaignPatch, BuilderCommand, CounterPatch, SourcePatch, TransformPatch};
use crate::error::{BuilderError, Result};
use crate::options::{BuilderOptions, RemovalPolicy};

/// A definition under construction plus the id counter that must survive
/// removals, so an id is never handed out twice.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderState {
    definition: ReportDefinition,
    next_source_seq: u64,
}

impl BuilderState {
    /// Start editing `definition`; new ids continue after the highest
    /// numeric suffix already in use.
    pub fn new(definition: ReportDefinition) -> Self {
        let next_source_seq = definition.max_source_sequence().map_or(1, |seq| seq + 1);
        Self {
            definition,
            next_source_seq,
        }
    }

    pub fn definition(&self) -> &ReportDefinition {
        &self.definition
    }

    pub fn into_definition(self) -> ReportDefinition {
        self.definition
    }

    pub fn next_source_seq(&self) -> u64 {
        self.next_source_seq
    }

    /// Keep the counter at or past `issued` so a restored snapshot cannot
    /// hand out an id again.
    pub(crate) fn keep_issued(&mut self, issued: u64) {
        self.next_source_seq = self.next_source_seq.max(issued);
    }
}

impl Default for BuilderState {
    fn default() -> Self {
        Self::new(ReportDefinition::default())
    }
}

/// Read-only inputs of the reducer.
#[derive(Debug, Clone, Copy)]
pub struct BuilderContext<'a> {
    pub options: &'a BuilderOptions,
    pub availability: Option<&'a SourceAvailability>,
}

pub fn reduce(
    state: &BuilderState,
    command: BuilderCommand,
    ctx: BuilderContext<'_>,
) -> Result<BuilderState> {
    let mut next = state.clone();
    let label = command.label();
    match command {
        BuilderCommand::AddSource { kind } => {
            add_source(&mut next, kind, ctx.availability)?;
        }
        BuilderCommand::UpdateSource { id, patch } => {
            update_source(&mut next.definition, &id, patch)?;
        }
        BuilderCommand::RemoveSource { id } => {
            remove_source(&mut next.definition, &id, ctx.options.removal_policy)?;
        }
        BuilderCommand::AddLocalTransform { source_id, kind } => {
            if kind.is_global_only() {
                return Err(BuilderError::JoinNotLocal);
            }
            let source = find_source(&mut next.definition, &source_id)?;
            source
                .transforms
                .push(Transformation::template(kind, Some(&source_id), None));
        }
        BuilderCommand::UpdateLocalTransform {
            source_id,
            index,
            patch,
        } => {
            let source = find_source(&mut next.definition, &source_id)?;
            let scope = format!("{source_id} local transformations");
            let len = source.transforms.len();
            let step = source
                .transforms
                .get_mut(index)
                .ok_or(BuilderError::InvalidIndex { scope, index, len })?;
            if patch.output.is_some() {
                return Err(BuilderError::InapplicableField {
                    field: "output",
                    kind: patch.kind.unwrap_or(step.kind()),
                });
            }
            if patch.kind.is_some_and(TransformKind::is_global_only) {
                return Err(BuilderError::JoinNotLocal);
            }
            *step = patch_transform(step, patch, None)?;
        }
        BuilderCommand::RemoveLocalTransform { source_id, index } => {
            let source = find_source(&mut next.definition, &source_id)?;
            let len = source.transforms.len();
            if index >= len {
                return Err(BuilderError::InvalidIndex {
                    scope: format!("{source_id} local transformations"),
                    index,
                    len,
                });
            }
            source.transforms.remove(index);
        }
        BuilderCommand::AddGlobalTransform { kind } => {
            let ids: Vec<String> = next
                .definition
                .source_ids()
                .map(|id| id.to_string())
                .collect();
            let step = Transformation::template(
                kind,
                ids.first().map(String::as_str),
                ids.get(1).map(String::as_str),
            );
            next.definition.global_transforms.push(GlobalStep::new(step));
        }
        BuilderCommand::UpdateGlobalTransform { index, patch } => {
            let len = next.definition.global_transforms.len();
            let fallback_right = {
                let primary = next
                    .definition
                    .global_transforms
                    .get(index)
                    .map(|step| step.transform.primary_input().to_string())
                    .unwrap_or_default();
                next.definition
                    .source_ids()
                    .find(|id| id.as_str() != primary)
                    .map(|id| id.to_string())
            };
            let step = next
                .definition
                .global_transforms
                .get_mut(index)
                .ok_or_else(|| BuilderError::InvalidIndex {
                    scope: "global transformations".to_string(),
                    index,
                    len,
                })?;
            let output = patch.output.clone();
            step.transform = patch_transform(&step.transform, patch, fallback_right.as_deref())?;
            if let Some(output) = output {
                let trimmed = output.trim();
                step.output = (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
        }
        BuilderCommand::RemoveGlobalTransform { index } => {
            let len = next.definition.global_transforms.len();
            if index >= len {
                return Err(BuilderError::InvalidIndex {
                    scope: "global transformations".to_string(),
                    index,
                    len,
                });
            }
            next.definition.global_transforms.remove(index);
        }
        BuilderCommand::SetPeriod {
            selector,
            custom_range,
        } => {
            next.definition.period = Period::from_selector(selector, custom_range);
        }
        BuilderCommand::SetExport(target) => {
            next.definition.export = target;
        }
        BuilderCommand::SetName(name) => {
            next.definition.name = name;
        }
    }
    debug!(command = label, sources = next.definition.sources.len(), "builder command applied");
    Ok(next)
}

fn find_source<'a>(definition: &'a mut ReportDefinition, id: &str) -> Result<&'a mut Source> {
    definition
        .source_mut(id)
        .ok_or_else(|| BuilderError::SourceNotFound(id.to_string()))
}

fn add_source(
    state: &mut BuilderState,
    kind: SourceKind,
    availability: Option<&SourceAvailability>,
) -> Result<()> {
    if let Some(availability) = availability
        && !availability.is_available(kind)
    {
        return Err(BuilderError::SourceKindUnavailable(kind));
    }

    let id = loop {
        let candidate = SourceId::generate(kind, state.next_source_seq);
        state.next_source_seq += 1;
        if state.definition.source(candidate.as_str()).is_none() {
            break candidate;
        }
    };

    let config = match kind {
        SourceKind::AdCampaigns => SourceConfig::AdCampaigns(AdCampaignConfig::default()),
        SourceKind::AnalyticsCounter => SourceConfig::AnalyticsCounter(CounterConfig::with_defaults(
            availability.and_then(SourceAvailability::default_counter),
        )),
    };
    state.definition.sources.push(Source::new(id, config));
    Ok(())
}

fn update_source(definition: &mut ReportDefinition, id: &str, patch: SourcePatch) -> Result<()> {
    let source = find_source(definition, id)?;
    match (&mut source.config, patch) {
        (SourceConfig::AdCampaigns(config), SourcePatch::AdCampaigns(patch)) => {
            merge_campaigns(config, patch);
        }
        (SourceConfig::AnalyticsCounter(config), SourcePatch::AnalyticsCounter(patch)) => {
            merge_counter(config, patch);
        }
        (config, patch) => {
            return Err(BuilderError::KindMismatch {
                id: id.to_string(),
                actual: config.kind(),
                requested: patch.kind(),
            });
        }
    }
    Ok(())
}

fn merge_campaigns(config: &mut AdCampaignConfig, patch: AdCampaignPatch) {
    if let Some(campaign_ids) = patch.campaign_ids {
        config.campaign_ids = campaign_ids;
    }
    if let Some(fields) = patch.fields {
        config.fields = fields;
    }
    if let Some(group_by) = patch.group_by {
        config.group_by = group_by;
    }
}

fn merge_counter(config: &mut CounterConfig, patch: CounterPatch) {
    if let Some(counter_id) = patch.counter_id {
        config.counter_id = Some(counter_id);
    }
    if let Some(goals) = patch.goals {
        config.goals = goals;
    }
    if let Some(metrics) = patch.metrics {
        config.metrics = metrics;
    }
    if let Some(dimensions) = patch.dimensions {
        config.dimensions = dimensions;
    }
}

fn remove_source(definition: &mut ReportDefinition, id: &str, policy: RemovalPolicy) -> Result<()> {
    let index = definition
        .source_index(id)
        .ok_or_else(|| BuilderError::SourceNotFound(id.to_string()))?;
    let dependents = definition.global_dependents(id);
    if policy == RemovalPolicy::Block && !dependents.is_empty() {
        return Err(BuilderError::SourceInUse {
            id: id.to_string(),
            dependents,
        });
    }

    definition.sources.remove(index);
    if policy == RemovalPolicy::Cascade {
        let dropped = cascade_dependents(definition, id);
        debug!(source = id, dropped = ?dropped, "removed dependent global steps");
    }
    Ok(())
}

/// Drop every global step that loses an input because `removed` is gone,
/// following outputs of dropped steps through the chain.
///
/// Steps that were dangling for other reasons are left for validation.
fn cascade_dependents(definition: &mut ReportDefinition, removed: &str) -> Vec<usize> {
    let mut lost: HashSet<String> = HashSet::from([removed.to_string()]);
    let mut available: HashSet<String> = definition
        .source_ids()
        .map(|id| id.to_string())
        .collect();

    let steps = std::mem::take(&mut definition.global_transforms);
    let mut kept = Vec::with_capacity(steps.len());
    let mut dropped = Vec::new();
    for (idx, step) in steps.into_iter().enumerate() {
        let output = step.output_name().to_string();
        let dangling = step
            .transform
            .inputs()
            .iter()
            .any(|(_, name)| lost.contains(*name) && !available.contains(*name));
        if dangling {
            dropped.push(idx);
            if !available.contains(&output) {
                lost.insert(output);
            }
        } else {
            lost.remove(&output);
            available.insert(output);
            kept.push(step);
        }
    }
    definition.global_transforms = kept;
    dropped
}

/// Merge `patch` into a copy of `current`.
///
/// `fallback_right` seeds the `right` input when a global step becomes a
/// join.
fn patch_transform(
    current: &Transformation,
    patch: TransformPatch,
    fallback_right: Option<&str>,
) -> Result<Transformation> {
    let mut step = match patch.kind {
        Some(kind) if kind != current.kind() => {
            Transformation::template(kind, Some(current.primary_input()), fallback_right)
        }
        _ => current.clone(),
    };
    let kind = step.kind();
    let inapplicable = |field: &'static str| BuilderError::InapplicableField { field, kind };

    if let Some(source) = patch.source {
        if kind == TransformKind::Join {
            return Err(inapplicable("source"));
        }
        step.set_source(&source);
    }
    if let Some(column) = patch.column {
        match &mut step {
            Transformation::Extract(t) => t.column = column,
            Transformation::Filter(t) => t.column = column,
            _ => return Err(inapplicable("column")),
        }
    }
    if let Some(pattern) = patch.pattern {
        match &mut step {
            Transformation::Extract(t) => t.pattern = pattern,
            _ => return Err(inapplicable("pattern")),
        }
    }
    if let Some(output_column) = patch.output_column {
        match &mut step {
            Transformation::Extract(t) => t.output_column = output_column,
            Transformation::Calculate(t) => t.output_column = output_column,
            _ => return Err(inapplicable("output_column")),
        }
    }
    if let Some(columns) = patch.columns {
        match &mut step {
            Transformation::GroupBy(t) => t.columns = columns,
            Transformation::Sort(t) => t.columns = columns,
            _ => return Err(inapplicable("columns")),
        }
    }
    if let Some(aggregations) = patch.aggregations {
        match &mut step {
            Transformation::GroupBy(t) => t.aggregations = aggregations,
            _ => return Err(inapplicable("aggregations")),
        }
    }
    if let Some(mapping) = patch.mapping {
        match &mut step {
            Transformation::Rename(t) => t.mapping = mapping,
            _ => return Err(inapplicable("mapping")),
        }
    }
    if let Some(operator) = patch.operator {
        match &mut step {
            Transformation::Filter(t) => t.operator = operator,
            _ => return Err(inapplicable("operator")),
        }
    }
    if let Some(value) = patch.value {
        match &mut step {
            Transformation::Filter(t) => {
                t.value = (!matches!(value, Scalar::Null)).then_some(value);
            }
            _ => return Err(inapplicable("value")),
        }
    }
    if let Some(formula) = patch.formula {
        match &mut step {
            Transformation::Calculate(t) => t.formula = formula,
            _ => return Err(inapplicable("formula")),
        }
    }

    let join_fields = [
        ("left", patch.left),
        ("right", patch.right),
        ("on", patch.on),
        ("how", patch.how),
    ];
    for (field, value) in join_fields {
        let Some(value) = value else {
            continue;
        };
        let Transformation::Join(join) = &mut step else {
            return Err(inapplicable(field));
        };
        match field {
            "left" => join.left = value,
            "right" => join.right = value,
            "on" => join.on = value,
            _ => join.how = value,
        }
    }

    Ok(step)
}
