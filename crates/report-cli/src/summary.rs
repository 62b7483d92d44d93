use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use report_core::{CatalogSnapshot, ReportRun};
use report_model::{
    IssueKind, PreviewResult, RunStatus, Scalar, SourceKind, ValidationReport, format_numeric,
};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

pub fn print_validation(report: &ValidationReport) {
    if report.is_valid() {
        println!("Definition is valid.");
        return;
    }
    println!("{}", issue_headline(report));
    println!("{}", issues_table(report));
}

/// `3 issues (2 validation, 1 reference)`.
pub fn issue_headline(report: &ValidationReport) -> String {
    let total = report.issues.len();
    let parts: Vec<String> = [
        IssueKind::Validation,
        IssueKind::Reference,
        IssueKind::Unsupported,
    ]
    .into_iter()
    .filter_map(|kind| {
        let count = report.count(kind);
        (count > 0).then(|| format!("{count} {}", kind.label().to_lowercase()))
    })
    .collect();
    let noun = if total == 1 { "issue" } else { "issues" };
    format!("{total} {noun} ({})", parts.join(", "))
}

pub fn issues_table(report: &ValidationReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Kind"),
        header_cell("Field"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    for issue in &report.issues {
        table.add_row(vec![
            kind_cell(issue.kind),
            Cell::new(&issue.field),
            Cell::new(&issue.message),
        ]);
    }
    table
}

pub fn print_preview(result: &PreviewResult) {
    println!("{}", preview_table(result));
    println!("{}", preview_footer(result));
}

pub fn preview_table(result: &PreviewResult) -> Table {
    let mut table = Table::new();
    table.set_header(result.columns.iter().map(|c| header_cell(c)).collect::<Vec<_>>());
    apply_table_style(&mut table);
    for row in &result.data {
        table.add_row(
            result
                .columns
                .iter()
                .map(|column| scalar_cell(row.get(column).unwrap_or(&Scalar::Null)))
                .collect::<Vec<_>>(),
        );
    }
    for (idx, column) in result.columns.iter().enumerate() {
        let numeric = result.data.iter().all(|row| {
            matches!(
                row.get(column),
                None | Some(Scalar::Null | Scalar::Int(_) | Scalar::Float(_))
            )
        });
        if numeric {
            align_column(&mut table, idx, CellAlignment::Right);
        }
    }
    table
}

/// Row count, period and anything that went wrong, one fact per line.
pub fn preview_footer(result: &PreviewResult) -> String {
    let mut lines = Vec::new();
    if result.is_truncated() {
        lines.push(format!(
            "Rows: {} (showing {})",
            result.row_count,
            result.data.len()
        ));
    } else {
        lines.push(format!("Rows: {}", result.row_count));
    }
    if let Some(period) = &result.period {
        lines.push(format!("Period: {period} ({} days)", period.days()));
    }
    for failure in &result.source_errors {
        lines.push(format!(
            "Source {} failed: {}",
            failure.source, failure.message
        ));
    }
    if !result.skipped_steps.is_empty() {
        let steps: Vec<String> = result.skipped_steps.iter().map(usize::to_string).collect();
        lines.push(format!("Skipped global steps: {}", steps.join(", ")));
    }
    lines.join("\n")
}

pub fn print_run(run: &ReportRun) {
    println!("{}", run_headline(run));
    if let Some(table) = &run.table {
        print_preview(table);
    }
}

pub fn run_headline(run: &ReportRun) -> String {
    let record = &run.record;
    match record.status {
        RunStatus::Failed => format!(
            "Run failed: {}",
            record.error_message.as_deref().unwrap_or("unknown error")
        ),
        RunStatus::Running => "Run still in progress".to_string(),
        RunStatus::Completed | RunStatus::Partial => {
            let rows = record.row_count.unwrap_or_default();
            let partial = if record.status == RunStatus::Partial {
                ", some sources failed"
            } else {
                ""
            };
            format!("Run completed: {rows} rows{partial}")
        }
    }
}

pub fn print_catalog(snapshot: &CatalogSnapshot) {
    println!("{}", catalog_table(snapshot));
    for warning in &snapshot.warnings {
        eprintln!("warning: {warning}");
    }
}

pub fn catalog_table(snapshot: &CatalogSnapshot) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source kind"),
        header_cell("Available"),
        header_cell("Entries"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Right);
    for kind in SourceKind::ALL {
        let entries = match kind {
            SourceKind::AdCampaigns => snapshot.campaigns.len(),
            SourceKind::AnalyticsCounter => snapshot.counters.len(),
        };
        let available = if snapshot.availability.is_available(kind) {
            Cell::new("yes").fg(Color::Green)
        } else {
            dim_cell("no")
        };
        table.add_row(vec![Cell::new(kind.label()), available, Cell::new(entries)]);
    }
    table
}

/// Text of one cell; null renders as `-`.
pub fn format_scalar(value: &Scalar) -> String {
    match value {
        Scalar::Null => "-".to_string(),
        Scalar::Float(v) => format_numeric(*v),
        other => other.to_string(),
    }
}

fn scalar_cell(value: &Scalar) -> Cell {
    match value {
        Scalar::Null => dim_cell(format_scalar(value)),
        _ => Cell::new(format_scalar(value)),
    }
}

fn kind_cell(kind: IssueKind) -> Cell {
    let color = match kind {
        IssueKind::Validation => Color::Red,
        IssueKind::Reference => Color::Yellow,
        IssueKind::Unsupported => Color::Magenta,
    };
    Cell::new(kind.label())
        .fg(color)
        .add_attribute(Attribute::Bold)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use report_model::ValidationIssue;

    #[test]
    fn headline_counts_by_kind() {
        let report = ValidationReport {
            issues: vec![
                ValidationIssue::validation("name", "report name is required"),
                ValidationIssue::reference("transformations[0].right", "unknown"),
                ValidationIssue::validation("sources", "at least one source is required"),
            ],
        };
        assert_eq!(issue_headline(&report), "3 issues (2 validation, 1 reference)");
    }

    #[test]
    fn null_and_float_cells() {
        assert_eq!(format_scalar(&Scalar::Null), "-");
        assert_eq!(format_scalar(&Scalar::Float(2.50)), "2.5");
        assert_eq!(format_scalar(&Scalar::Str("google".into())), "google");
    }
}
