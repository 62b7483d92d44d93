use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use report_builder::{ValidationContext, validate};
use report_core::{
    CatalogSnapshot, Clock, ExecutionOptions, FixedClock, ReportExecutor, ReportRun, SystemClock,
    load_catalogs,
};
use report_model::{
    DateRange, FutureDatePolicy, Period, PreviewResult, ReportDefinition, ReportId,
    ValidationReport, parse_spreadsheet_id,
};
use tracing::{info, instrument};

use crate::cli::{CatalogArgs, DateArgs, PeriodArgs, PreviewArgs, SaveArgs, ValidateArgs};
use crate::fixtures::{Fixture, JsonFileStore};

/// What `preview` produced: a bounded preview or, with `--full`, a run.
#[derive(Debug)]
pub enum PreviewOutcome {
    Preview(PreviewResult),
    Run(ReportRun),
}

pub fn load_definition(path: &Path) -> Result<ReportDefinition> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read definition {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse definition {}", path.display()))
}

fn load_options(path: Option<&Path>) -> Result<ExecutionOptions> {
    let Some(path) = path else {
        return Ok(ExecutionOptions::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    ExecutionOptions::from_json(&text).with_context(|| format!("parse config {}", path.display()))
}

fn clock_for(dates: &DateArgs) -> Arc<dyn Clock> {
    match dates.today {
        Some(today) => Arc::new(FixedClock::at_date(today)),
        None => Arc::new(SystemClock),
    }
}

fn future_policy(dates: &DateArgs) -> FutureDatePolicy {
    if dates.allow_future_dates {
        FutureDatePolicy::Allow
    } else {
        FutureDatePolicy::Reject
    }
}

pub async fn run_validate(args: &ValidateArgs) -> Result<ValidationReport> {
    let definition = load_definition(&args.definition)?;
    let today = clock_for(&args.dates).today();
    let base = if args.save {
        ValidationContext::save(today)
    } else {
        ValidationContext::preview(today)
    };
    let ctx = base.with_future_dates(future_policy(&args.dates));

    let snapshot = match &args.catalog {
        Some(path) => Some(catalog_from(&Fixture::load(path)?, 1).await),
        None => None,
    };
    let ctx = match &snapshot {
        Some(snapshot) => ctx.with_availability(&snapshot.availability),
        None => ctx,
    };

    let report = validate(&definition, &ctx);
    info!(
        sources = definition.sources.len(),
        issues = report.issues.len(),
        "definition validated"
    );
    Ok(report)
}

#[instrument(skip_all, fields(definition = %args.definition.display()))]
pub async fn run_preview(args: &PreviewArgs) -> Result<PreviewOutcome> {
    let definition = load_definition(&args.definition)?;
    let fixture = Arc::new(Fixture::load(&args.data)?);
    let mut options = load_options(args.config.as_deref())?;
    if args.dates.allow_future_dates {
        options.future_dates = FutureDatePolicy::Allow;
    }
    if let Some(rows) = args.rows {
        options.preview_row_limit = rows;
    }

    let executor = ReportExecutor::new(fixture, Arc::new(JsonFileStore::new(".")))
        .with_clock(clock_for(&args.dates))
        .with_options(options);
    if args.full {
        return Ok(PreviewOutcome::Run(executor.run(&definition).await));
    }
    Ok(PreviewOutcome::Preview(executor.preview(&definition).await?))
}

pub async fn run_save(args: &SaveArgs) -> Result<ReportId> {
    let definition = load_definition(&args.definition)?;
    let name = args.name.clone().unwrap_or_else(|| definition.name.clone());
    let store = JsonFileStore::new(&args.store_dir);
    let executor = ReportExecutor::new(Arc::new(Fixture::default()), Arc::new(store.clone()))
        .with_clock(clock_for(&args.dates))
        .with_options(ExecutionOptions {
            future_dates: future_policy(&args.dates),
            ..Default::default()
        });

    let id = executor.save(&name, &definition).await?;
    info!(report = %id, path = %store.path_for(id).display(), "report written");
    Ok(id)
}

pub async fn run_catalog(args: &CatalogArgs) -> Result<CatalogSnapshot> {
    let fixture = Fixture::load(&args.fixture)?;
    Ok(catalog_from(&fixture, args.project).await)
}

async fn catalog_from(fixture: &Fixture, project: u64) -> CatalogSnapshot {
    load_catalogs(project, fixture, fixture, fixture).await
}

pub fn run_resolve_period(args: &PeriodArgs) -> Result<DateRange> {
    let custom = match (args.from, args.to) {
        (Some(from), Some(to)) => Some((from, to)),
        (None, None) => None,
        _ => anyhow::bail!("--from and --to must be given together"),
    };
    let period = Period::from_selector(args.selector, custom);
    let range = period
        .resolve(clock_for(&args.dates).today(), future_policy(&args.dates))
        .with_context(|| format!("resolve period {}", args.selector))?;
    Ok(range)
}

pub fn run_sheet_id(url: &str) -> String {
    parse_spreadsheet_id(url)
}
