//! Editing session with undo and redo.

use std::collections::VecDeque;

use chrono::NaiveDate;
use report_model::{
    ExportTarget, PeriodSelector, ReportDefinition, Source, SourceKind, TransformKind,
    ValidationReport,
};
use tracing::{debug, info};

use crate::availability::SourceAvailability;
use crate::command::{BuilderCommand, SourcePatch, TransformPatch};
use crate::error::{BuilderError, Result};
use crate::options::BuilderOptions;
use crate::reducer::{BuilderContext, BuilderState, reduce};
use crate::validate::{ValidationContext, validate};

/// Owns the definition under construction and its history.
///
/// Every operation goes through [`reduce`]; a rejected command leaves the
/// session untouched.
#[derive(Debug, Clone, Default)]
pub struct BuilderSession {
    state: BuilderState,
    options: BuilderOptions,
    availability: Option<SourceAvailability>,
    undo_stack: VecDeque<BuilderState>,
    redo_stack: Vec<BuilderState>,
}

impl BuilderSession {
    pub fn new(definition: ReportDefinition, options: BuilderOptions) -> Self {
        Self {
            state: BuilderState::new(definition),
            options,
            availability: None,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn with_availability(mut self, availability: SourceAvailability) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn set_availability(&mut self, availability: Option<SourceAvailability>) {
        self.availability = availability;
    }

    pub fn availability(&self) -> Option<&SourceAvailability> {
        self.availability.as_ref()
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    pub fn definition(&self) -> &ReportDefinition {
        self.state.definition()
    }

    pub fn into_definition(self) -> ReportDefinition {
        self.state.into_definition()
    }

    /// Run `command` through the reducer and record the previous state.
    pub fn apply(&mut self, command: BuilderCommand) -> Result<&ReportDefinition> {
        let ctx = BuilderContext {
            options: &self.options,
            availability: self.availability.as_ref(),
        };
        let next = reduce(&self.state, command, ctx)?;
        let previous = std::mem::replace(&mut self.state, next);
        if self.options.history_limit > 0 {
            self.undo_stack.push_back(previous);
            while self.undo_stack.len() > self.options.history_limit {
                self.undo_stack.pop_front();
            }
        }
        self.redo_stack.clear();
        Ok(self.state.definition())
    }

    pub fn undo(&mut self) -> Result<&ReportDefinition> {
        let previous = self.undo_stack.pop_back().ok_or(BuilderError::NothingToUndo)?;
        let current = self.restore(previous);
        self.redo_stack.push(current);
        debug!(remaining = self.undo_stack.len(), "undo");
        Ok(self.state.definition())
    }

    pub fn redo(&mut self) -> Result<&ReportDefinition> {
        let next = self.redo_stack.pop().ok_or(BuilderError::NothingToRedo)?;
        let current = self.restore(next);
        self.undo_stack.push_back(current);
        debug!(remaining = self.redo_stack.len(), "redo");
        Ok(self.state.definition())
    }

    /// Swap in a history snapshot. The id counter is not part of history:
    /// it only moves forward.
    fn restore(&mut self, mut snapshot: BuilderState) -> BuilderState {
        snapshot.keep_issued(self.state.next_source_seq());
        std::mem::replace(&mut self.state, snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Append a source of `kind` with that kind's defaults and return it.
    pub fn add_source(&mut self, kind: SourceKind) -> Result<Source> {
        let definition = self.apply(BuilderCommand::AddSource { kind })?;
        let source = definition
            .sources
            .last()
            .cloned()
            .ok_or_else(|| BuilderError::SourceNotFound(kind.wire_name().to_string()))?;
        info!(id = %source.id, kind = %kind, "source added");
        Ok(source)
    }

    pub fn update_source(&mut self, id: &str, patch: SourcePatch) -> Result<&ReportDefinition> {
        self.apply(BuilderCommand::UpdateSource {
            id: id.to_string(),
            patch,
        })
    }

    pub fn remove_source(&mut self, id: &str) -> Result<&ReportDefinition> {
        self.apply(BuilderCommand::RemoveSource { id: id.to_string() })
    }

    pub fn add_local_transform(
        &mut self,
        source_id: &str,
        kind: TransformKind,
    ) -> Result<&ReportDefinition> {
        self.apply(BuilderCommand::AddLocalTransform {
            source_id: source_id.to_string(),
            kind,
        })
    }

    pub fn update_local_transform(
        &mut self,
        source_id: &str,
        index: usize,
        patch: TransformPatch,
    ) -> Result<&ReportDefinition> {
        self.apply(BuilderCommand::UpdateLocalTransform {
            source_id: source_id.to_string(),
            index,
            patch,
        })
    }

    pub fn remove_local_transform(
        &mut self,
        source_id: &str,
        index: usize,
    ) -> Result<&ReportDefinition> {
        self.apply(BuilderCommand::RemoveLocalTransform {
            source_id: source_id.to_string(),
            index,
        })
    }

    pub fn add_global_transform(&mut self, kind: TransformKind) -> Result<&ReportDefinition> {
        self.apply(BuilderCommand::AddGlobalTransform { kind })
    }

    pub fn update_global_transform(
        &mut self,
        index: usize,
        patch: TransformPatch,
    ) -> Result<&ReportDefinition> {
        self.apply(BuilderCommand::UpdateGlobalTransform { index, patch })
    }

    pub fn remove_global_transform(&mut self, index: usize) -> Result<&ReportDefinition> {
        self.apply(BuilderCommand::RemoveGlobalTransform { index })
    }

    pub fn set_period(
        &mut self,
        selector: PeriodSelector,
        custom_range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<&ReportDefinition> {
        self.apply(BuilderCommand::SetPeriod {
            selector,
            custom_range,
        })
    }

    pub fn set_export(&mut self, target: ExportTarget) -> Result<&ReportDefinition> {
        self.apply(BuilderCommand::SetExport(target))
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<&ReportDefinition> {
        self.apply(BuilderCommand::SetName(name.into()))
    }

    /// Validate the current definition. The session's availability is used
    /// unless `ctx` carries its own.
    pub fn validate(&self, ctx: ValidationContext<'_>) -> ValidationReport {
        let ctx = ValidationContext {
            purpose: ctx.purpose,
            today: ctx.today,
            future_dates: ctx.future_dates,
            availability: ctx.availability.or(self.availability.as_ref()),
        };
        validate(self.state.definition(), &ctx)
    }
}
