//! Definition validation.
//!
//! [`validate`] walks the whole definition and records every broken
//! invariant rather than stopping at the first one. Issues come out in
//! definition order: name, sources (with their local chains), period,
//! export, then the global chain.

use std::collections::HashSet;

use chrono::NaiveDate;
use regex::Regex;
use report_model::{
    AggregateFunction, FilterOperator, FutureDatePolicy, JoinHow, ReportDefinition, Source,
    SourceConfig, Transformation, ValidationIssue, ValidationReport,
};
use report_transform::Formula;

use crate::availability::SourceAvailability;

/// What the definition is about to be submitted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPurpose {
    #[default]
    Preview,
    /// Saving additionally requires a name.
    Save,
}

#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub purpose: ValidationPurpose,
    /// Date that period bounds are checked against.
    pub today: NaiveDate,
    pub future_dates: FutureDatePolicy,
    /// Kinds the project can use; `None` skips the check.
    pub availability: Option<&'a SourceAvailability>,
}

impl<'a> ValidationContext<'a> {
    pub fn preview(today: NaiveDate) -> Self {
        Self {
            purpose: ValidationPurpose::Preview,
            today,
            future_dates: FutureDatePolicy::default(),
            availability: None,
        }
    }

    pub fn save(today: NaiveDate) -> Self {
        Self {
            purpose: ValidationPurpose::Save,
            ..Self::preview(today)
        }
    }

    pub fn with_future_dates(mut self, policy: FutureDatePolicy) -> Self {
        self.future_dates = policy;
        self
    }

    pub fn with_availability(mut self, availability: &'a SourceAvailability) -> Self {
        self.availability = Some(availability);
        self
    }
}

/// Every invariant violation of `definition`, in order.
pub fn validate(definition: &ReportDefinition, ctx: &ValidationContext<'_>) -> ValidationReport {
    let mut report = ValidationReport::default();

    if ctx.purpose == ValidationPurpose::Save && definition.name.trim().is_empty() {
        report.push(ValidationIssue::validation("name", "report name is required"));
    }

    check_sources(definition, ctx, &mut report);
    check_period(definition, ctx, &mut report);
    check_export(definition, &mut report);
    check_global_chain(definition, &mut report);

    report
}

/// Validate, then produce the form that is actually submitted: a `custom`
/// period with unset bounds is pinned to concrete dates and the export
/// target is normalized.
pub fn prepare_submission(
    definition: &ReportDefinition,
    ctx: &ValidationContext<'_>,
) -> Result<ReportDefinition, ValidationReport> {
    let report = validate(definition, ctx);
    if !report.is_valid() {
        return Err(report);
    }

    let mut prepared = definition.clone();
    prepared.period = definition.period.materialize(ctx.today).map_err(|err| ValidationReport {
        issues: vec![ValidationIssue::validation("period", err.to_string())],
    })?;
    prepared.export = definition.export.normalized();
    Ok(prepared)
}

fn check_sources(
    definition: &ReportDefinition,
    ctx: &ValidationContext<'_>,
    report: &mut ValidationReport,
) {
    if definition.sources.is_empty() {
        report.push(ValidationIssue::validation(
            "sources",
            "at least one source is required",
        ));
        return;
    }

    let mut seen = HashSet::new();
    for (idx, source) in definition.sources.iter().enumerate() {
        let prefix = format!("sources[{idx}]");
        if !seen.insert(source.id.as_str()) {
            report.push(ValidationIssue::validation(
                format!("{prefix}.id"),
                format!("duplicate source id '{}'", source.id),
            ));
        }
        if let Some(availability) = ctx.availability
            && !availability.is_available(source.kind())
        {
            report.push(ValidationIssue::validation(
                format!("{prefix}.type"),
                format!("{} sources are not available", source.kind().label()),
            ));
        }
        check_source_config(source, &prefix, report);
        check_local_chain(source, &prefix, report);
    }
}

fn check_source_config(source: &Source, prefix: &str, report: &mut ValidationReport) {
    match &source.config {
        SourceConfig::AdCampaigns(config) => {
            let unknown = config.unknown_fields();
            if !unknown.is_empty() {
                report.push(ValidationIssue::validation(
                    format!("{prefix}.fields"),
                    format!("unknown campaign fields: {}", unknown.join(", ")),
                ));
            }
        }
        SourceConfig::AnalyticsCounter(config) => {
            if config.counter_id.is_none() {
                report.push(ValidationIssue::validation(
                    format!("{prefix}.counter_id"),
                    "counter is required",
                ));
            }
        }
    }
}

fn check_local_chain(source: &Source, prefix: &str, report: &mut ValidationReport) {
    for (idx, step) in source.transforms.iter().enumerate() {
        let step_prefix = format!("{prefix}.source_transformations[{idx}]");
        if let Transformation::Join(_) = step {
            report.push(ValidationIssue::validation(
                format!("{step_prefix}.type"),
                "join is only allowed in the global chain",
            ));
            continue;
        }

        let input = step.primary_input();
        if input.trim().is_empty() {
            required(report, &step_prefix, "source");
        } else if source.id != input {
            report.push(ValidationIssue::reference(
                format!("{step_prefix}.source"),
                format!(
                    "local step must read its own source '{}', not '{input}'",
                    source.id
                ),
            ));
        }
        check_fields(step, &step_prefix, report);
    }
}

fn check_period(
    definition: &ReportDefinition,
    ctx: &ValidationContext<'_>,
    report: &mut ValidationReport,
) {
    for violation in definition.period.violations(ctx.today, ctx.future_dates) {
        report.push(ValidationIssue::validation(
            format!("period.{}", violation.field),
            violation.error.to_string(),
        ));
    }
}

fn check_export(definition: &ReportDefinition, report: &mut ValidationReport) {
    if !definition.export.is_addressable() {
        report.push(ValidationIssue::validation(
            "export.spreadsheet_id",
            "spreadsheet is required unless a new one is created",
        ));
    }
}

fn check_global_chain(definition: &ReportDefinition, report: &mut ValidationReport) {
    let mut names: HashSet<&str> = definition.source_ids().map(|id| id.as_str()).collect();
    for (idx, step) in definition.global_transforms.iter().enumerate() {
        let prefix = format!("transformations[{idx}]");
        let mut unresolved = Vec::new();
        for (field, input) in step.transform.inputs() {
            if input.trim().is_empty() {
                required(report, &prefix, field);
            } else if !names.contains(input) {
                report.push(ValidationIssue::reference(
                    format!("{prefix}.{field}"),
                    format!("unknown source or step output '{input}'"),
                ));
                unresolved.push(input);
            }
        }
        check_fields(&step.transform, &prefix, report);

        // A step writing back to a name it could not resolve does not make
        // that name exist for later steps.
        let output = step.output_name();
        if !output.trim().is_empty() && !unresolved.contains(&output) {
            names.insert(output);
        }
    }
}

fn required(report: &mut ValidationReport, prefix: &str, field: &str) {
    report.push(ValidationIssue::validation(
        format!("{prefix}.{field}"),
        format!("{field} is required"),
    ));
}

fn require_text(report: &mut ValidationReport, prefix: &str, field: &str, value: &str) {
    if value.trim().is_empty() {
        required(report, prefix, field);
    }
}

/// Kind-specific field checks, shared by both chains.
fn check_fields(step: &Transformation, prefix: &str, report: &mut ValidationReport) {
    match step {
        Transformation::Extract(t) => {
            require_text(report, prefix, "column", &t.column);
            if t.pattern.trim().is_empty() {
                required(report, prefix, "pattern");
            } else if let Err(err) = Regex::new(&t.pattern) {
                report.push(ValidationIssue::validation(
                    format!("{prefix}.pattern"),
                    format!("invalid regular expression: {err}"),
                ));
            }
            require_text(report, prefix, "output_column", &t.output_column);
        }
        Transformation::GroupBy(t) => {
            for (idx, column) in t.columns.iter().enumerate() {
                if column.trim().is_empty() {
                    required(report, prefix, &format!("columns[{idx}]"));
                }
            }
            if t.aggregations.is_empty() {
                report.push(ValidationIssue::validation(
                    format!("{prefix}.aggregations"),
                    "at least one aggregation is required",
                ));
            }
            for (column, function) in &t.aggregations {
                if t.columns.contains(column) {
                    report.push(ValidationIssue::validation(
                        format!("{prefix}.aggregations.{column}"),
                        format!("'{column}' is a group column and cannot also be aggregated"),
                    ));
                }
                if let Err(err) = function.parse::<AggregateFunction>() {
                    report.push(ValidationIssue::unsupported(
                        format!("{prefix}.aggregations.{column}"),
                        err.to_string(),
                    ));
                }
            }
        }
        Transformation::Join(t) => {
            require_text(report, prefix, "on", &t.on);
            if let Err(err) = t.how.parse::<JoinHow>() {
                report.push(ValidationIssue::unsupported(
                    format!("{prefix}.how"),
                    err.to_string(),
                ));
            }
        }
        Transformation::Rename(t) => {
            if t.mapping.is_empty() {
                report.push(ValidationIssue::validation(
                    format!("{prefix}.mapping"),
                    "at least one column must be renamed",
                ));
            }
            for (old, new) in &t.mapping {
                if new.trim().is_empty() {
                    report.push(ValidationIssue::validation(
                        format!("{prefix}.mapping.{old}"),
                        "new column name is required",
                    ));
                }
            }
        }
        Transformation::Filter(t) => {
            require_text(report, prefix, "column", &t.column);
            match t.operator.parse::<FilterOperator>() {
                Err(err) => report.push(ValidationIssue::unsupported(
                    format!("{prefix}.operator"),
                    err.to_string(),
                )),
                Ok(operator) if operator.takes_value() => {
                    if t.value.as_ref().is_none_or(|value| value.is_null()) {
                        report.push(ValidationIssue::validation(
                            format!("{prefix}.value"),
                            format!("operator '{}' needs a value", t.operator),
                        ));
                    }
                }
                Ok(_) => {}
            }
        }
        Transformation::Calculate(t) => {
            require_text(report, prefix, "output_column", &t.output_column);
            if t.formula.trim().is_empty() {
                required(report, prefix, "formula");
            } else if let Err(err) = Formula::parse(&t.formula) {
                report.push(ValidationIssue::validation(
                    format!("{prefix}.formula"),
                    err.to_string(),
                ));
            }
        }
        Transformation::Sort(t) => {
            if t.columns.is_empty() {
                report.push(ValidationIssue::validation(
                    format!("{prefix}.columns"),
                    "at least one column is required",
                ));
            }
        }
    }
}
