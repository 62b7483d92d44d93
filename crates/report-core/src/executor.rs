//! Preview, run and save.
//!
//! Every entry point validates first, so a definition only leaves this crate
//! when it is valid. Execution then has three phases:
//!
//! 1. resolve the period to absolute dates with the injected [`Clock`]
//! 2. fetch every source concurrently, each running its own local chain as
//!    soon as its fetch completes
//! 3. run the global chain once all sources are in
//!
//! A failed fetch is recorded on the result and only the steps that need
//! that source are skipped; execution fails only when every source fails.
//!
//! Frame building and both chains run on the blocking pool, so the preview
//! timeout also bounds slow transformations.

use std::sync::Arc;

use futures::future::join_all;
use polars::prelude::DataFrame;
use report_builder::{SourceAvailability, ValidationContext, prepare_submission};
use report_model::{
    DateRange, PreviewResult, ReportDefinition, ReportId, RunRecord, Source, SourceFailure,
};
use report_transform::{
    GlobalPipeline, SourceTable, apply_local_chain, column_names, frame_from_rows, frame_to_rows,
    row_columns,
};
use tokio::task;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::collaborators::{ReportStore, SourceFetcher};
use crate::config::ExecutionOptions;
use crate::error::{ExecutionError, Result};

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRun {
    pub record: RunRecord,
    /// The complete table, absent when the run failed.
    pub table: Option<PreviewResult>,
}

/// Executes report definitions against the external collaborators.
#[derive(Clone)]
pub struct ReportExecutor {
    fetcher: Arc<dyn SourceFetcher>,
    store: Arc<dyn ReportStore>,
    clock: Arc<dyn Clock>,
    options: ExecutionOptions,
    availability: Option<SourceAvailability>,
}

/// A source after its fetch: ready for the global chain, or unavailable.
enum Loaded {
    Ready(SourceTable),
    Failed(SourceTable, SourceFailure),
}

/// Result of the fetch and pipeline phases, before shaping.
struct Evaluation {
    frame: DataFrame,
    range: DateRange,
    source_errors: Vec<SourceFailure>,
    skipped_steps: Vec<usize>,
}

impl ReportExecutor {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, store: Arc<dyn ReportStore>) -> Self {
        Self {
            fetcher,
            store,
            clock: Arc::new(SystemClock),
            options: ExecutionOptions::default(),
            availability: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// Reject sources whose kind the project cannot use.
    pub fn with_availability(mut self, availability: SourceAvailability) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Bounded execution for inspection before saving.
    ///
    /// `data` holds at most `preview_row_limit` rows; `row_count` is the size
    /// of the full result. Exceeding `preview_timeout_ms` yields the
    /// retriable [`ExecutionError::Timeout`].
    pub async fn preview(&self, definition: &ReportDefinition) -> Result<PreviewResult> {
        let ctx = self.context(ValidationContext::preview(self.clock.today()));
        let prepared = prepare_submission(definition, &ctx).map_err(ExecutionError::Invalid)?;

        info!(sources = prepared.sources.len(), "preview started");
        let after_ms = self.options.preview_timeout_ms;
        let evaluation = tokio::time::timeout(self.options.preview_timeout(), self.evaluate(&prepared))
            .await
            .map_err(|_| {
                warn!(after_ms, "preview timed out");
                ExecutionError::Timeout { after_ms }
            })??;

        let result = shape(evaluation, Some(self.options.preview_row_limit))?;
        info!(
            rows = result.row_count,
            shown = result.data.len(),
            failed_sources = result.source_errors.len(),
            "preview finished"
        );
        Ok(result)
    }

    /// Unbounded execution returning the whole table and a run record.
    ///
    /// Failures are recorded on the record rather than returned.
    pub async fn run(&self, definition: &ReportDefinition) -> ReportRun {
        let record = RunRecord::started(self.clock.now());
        let outcome = async {
            let ctx = self.context(ValidationContext::preview(self.clock.today()));
            let prepared =
                prepare_submission(definition, &ctx).map_err(ExecutionError::Invalid)?;
            shape(self.evaluate(&prepared).await?, None)
        }
        .await;

        match outcome {
            Ok(table) => {
                info!(rows = table.row_count, partial = table.is_partial(), "run completed");
                ReportRun {
                    record: record.complete(self.clock.now(), table.row_count, table.is_partial()),
                    table: Some(table),
                }
            }
            Err(err) => {
                warn!(error = %err, "run failed");
                ReportRun {
                    record: record.fail(self.clock.now(), err.to_string()),
                    table: None,
                }
            }
        }
    }

    /// Validate for saving (a name is required) and persist the submission
    /// form of the definition under `name`.
    pub async fn save(&self, name: &str, definition: &ReportDefinition) -> Result<ReportId> {
        let mut named = definition.clone();
        named.name = name.trim().to_string();
        let ctx = self.context(ValidationContext::save(self.clock.today()));
        let prepared = prepare_submission(&named, &ctx).map_err(ExecutionError::Invalid)?;

        let id = self
            .store
            .save(&prepared.name, &prepared)
            .await
            .map_err(ExecutionError::Store)?;
        info!(report = %id, name = %prepared.name, "report saved");
        Ok(id)
    }

    fn context<'a>(&'a self, base: ValidationContext<'a>) -> ValidationContext<'a> {
        let ctx = base.with_future_dates(self.options.future_dates);
        match &self.availability {
            Some(availability) => ctx.with_availability(availability),
            None => ctx,
        }
    }

    async fn evaluate(&self, definition: &ReportDefinition) -> Result<Evaluation> {
        let range = definition
            .period
            .resolve(self.clock.today(), self.options.future_dates)?;

        let loads = definition
            .sources
            .iter()
            .map(|source| self.load_source(source, range));
        let mut tables = Vec::with_capacity(definition.sources.len());
        let mut source_errors = Vec::new();
        for loaded in join_all(loads).await {
            match loaded? {
                Loaded::Ready(table) => tables.push(table),
                Loaded::Failed(table, failure) => {
                    tables.push(table);
                    source_errors.push(failure);
                }
            }
        }
        if !source_errors.is_empty() && source_errors.len() == definition.sources.len() {
            return Err(ExecutionError::AllSourcesFailed(source_errors));
        }

        let steps = definition.global_transforms.clone();
        let output =
            task::spawn_blocking(move || GlobalPipeline::new(&steps).run(tables)).await??;
        Ok(Evaluation {
            frame: output.frame,
            range,
            source_errors,
            skipped_steps: output.skipped_steps,
        })
    }

    /// Fetch one source and run its local chain. Only a transformation
    /// failure is an error; a failed fetch is reported as [`Loaded::Failed`].
    async fn load_source(&self, source: &Source, range: DateRange) -> Result<Loaded> {
        let id = source.id.as_str();
        info!(source = id, kind = %source.kind(), period = %range, "fetching source");
        let raw = match self.fetcher.fetch(source, range).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(source = id, error = %err, "source fetch failed");
                return Ok(Loaded::Failed(
                    SourceTable::unavailable(id),
                    SourceFailure {
                        source: id.to_string(),
                        message: err.to_string(),
                    },
                ));
            }
        };

        let transforms = source.transforms.clone();
        let frame = task::spawn_blocking(move || -> report_transform::Result<DataFrame> {
            let columns = row_columns(&raw.columns, &raw.rows);
            let frame = frame_from_rows(&columns, &raw.rows)?;
            debug!(rows = frame.height(), "source rows converted");
            apply_local_chain(frame, &transforms)
        })
        .await??;
        info!(source = id, rows = frame.height(), "source ready");
        Ok(Loaded::Ready(SourceTable::available(id, frame)))
    }
}

/// Turn an evaluation into the result shape, keeping at most `limit` rows.
fn shape(evaluation: Evaluation, limit: Option<usize>) -> Result<PreviewResult> {
    let row_count = evaluation.frame.height();
    let shown = match limit {
        Some(limit) if limit < row_count => evaluation.frame.head(Some(limit)),
        _ => evaluation.frame.clone(),
    };
    Ok(PreviewResult {
        columns: column_names(&evaluation.frame),
        data: frame_to_rows(&shown)?,
        row_count,
        period: Some(evaluation.range),
        source_errors: evaluation.source_errors,
        skipped_steps: evaluation.skipped_steps,
    })
}
