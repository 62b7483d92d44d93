//! Command tests over definition and fixture files.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use report_builder::{BuilderSession, CounterPatch, SourcePatch, TransformPatch};
use report_cli::cli::{
    CatalogArgs, DateArgs, OutputFormatArg, PeriodArgs, PreviewArgs, SaveArgs, ValidateArgs,
};
use report_cli::commands::{
    PreviewOutcome, run_catalog, run_preview, run_resolve_period, run_save, run_sheet_id,
    run_validate,
};
use report_cli::fixtures::{Fixture, StoredReport};
use report_cli::summary::{catalog_table, preview_footer, preview_table, run_headline};
use report_core::{Counter, Integration, RawTable};
use report_model::{
    ExportTarget, PeriodSelector, ReportDefinition, ReportId, Row, Scalar, SourceKind,
    TransformKind,
};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("report-studio-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_json<T: serde::Serialize>(dir: &Path, file: &str, value: &T) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn dates() -> DateArgs {
    DateArgs {
        today: NaiveDate::from_ymd_opt(2025, 3, 10),
        allow_future_dates: false,
    }
}

fn campaign_rows() -> RawTable {
    let mut rows = Vec::new();
    for day in 3..=8 {
        for campaign in ["google_cpc", "yandex_cpc"] {
            let mut row = Row::new();
            row.insert("Date".into(), format!("2025-03-{day:02}").into());
            row.insert("CampaignName".into(), campaign.into());
            row.insert("Clicks".into(), Scalar::Int(day));
            rows.push(row);
        }
    }
    RawTable::new(
        vec!["Date".into(), "CampaignName".into(), "Clicks".into()],
        rows,
    )
}

fn daily_definition() -> ReportDefinition {
    let mut session = BuilderSession::default();
    session.set_name("Daily clicks").unwrap();
    session.add_source(SourceKind::AdCampaigns).unwrap();
    session
        .set_export(ExportTarget::existing("abc123", "Report"))
        .unwrap();
    session.into_definition()
}

fn joined_definition() -> ReportDefinition {
    let mut session = BuilderSession::new(daily_definition(), Default::default());
    session.add_source(SourceKind::AnalyticsCounter).unwrap();
    session
        .update_source(
            "metrika_2",
            SourcePatch::AnalyticsCounter(CounterPatch {
                counter_id: Some(42),
                ..Default::default()
            }),
        )
        .unwrap();
    session.add_global_transform(TransformKind::Join).unwrap();
    session
        .update_global_transform(
            0,
            TransformPatch {
                on: Some("Date".into()),
                ..Default::default()
            },
        )
        .unwrap();
    session.into_definition()
}

fn preview_args(definition: PathBuf, data: PathBuf) -> PreviewArgs {
    PreviewArgs {
        definition,
        data,
        config: None,
        rows: None,
        full: false,
        output: OutputFormatArg::Table,
        dates: dates(),
    }
}

#[test]
fn sheet_id_from_url() {
    assert_eq!(
        run_sheet_id("https://docs.google.com/spreadsheets/d/abc123/edit#gid=0"),
        "abc123"
    );
    assert_eq!(run_sheet_id("abc123"), "abc123");
}

#[test]
fn last_month_resolves_to_february() {
    let range = run_resolve_period(&PeriodArgs {
        selector: PeriodSelector::LastMonth,
        from: None,
        to: None,
        dates: dates(),
    })
    .unwrap();
    insta::assert_snapshot!(range.to_string(), @"2025-02-01..2025-02-28");
}

#[test]
fn custom_period_needs_both_bounds() {
    let err = run_resolve_period(&PeriodArgs {
        selector: PeriodSelector::Custom,
        from: NaiveDate::from_ymd_opt(2025, 3, 1),
        to: None,
        dates: dates(),
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "--from and --to must be given together");
}

#[tokio::test]
async fn validate_lists_every_issue() {
    let dir = scratch("validate");
    let definition = write_json(&dir, "report.json", &ReportDefinition::default());
    let report = run_validate(&ValidateArgs {
        definition,
        save: true,
        catalog: None,
        dates: dates(),
    })
    .await
    .unwrap();
    insta::assert_snapshot!(
        report.to_string(),
        @"name: report name is required; sources: at least one source is required; export.spreadsheet_id: spreadsheet is required unless a new one is created"
    );
}

#[tokio::test]
async fn validate_applies_catalog_availability() {
    let dir = scratch("validate-catalog");
    let definition = write_json(&dir, "report.json", &daily_definition());
    let fixture = Fixture {
        integrations: vec![Integration {
            kind: SourceKind::AnalyticsCounter,
            account: None,
        }],
        ..Default::default()
    };
    let catalog = write_json(&dir, "fixture.json", &fixture);
    let report = run_validate(&ValidateArgs {
        definition,
        save: false,
        catalog: Some(catalog),
        dates: dates(),
    })
    .await
    .unwrap();
    assert_eq!(report.fields(), vec!["sources[0].type"]);
}

#[tokio::test]
async fn preview_truncates_but_counts_everything() {
    let dir = scratch("preview");
    let definition = write_json(&dir, "report.json", &daily_definition());
    let mut fixture = Fixture::default();
    fixture.sources.insert("direct_1".into(), campaign_rows());
    let data = write_json(&dir, "fixture.json", &fixture);

    let outcome = run_preview(&preview_args(definition, data)).await.unwrap();
    let PreviewOutcome::Preview(result) = outcome else {
        panic!("expected a preview");
    };
    insta::assert_snapshot!(preview_footer(&result), @r"
    Rows: 12 (showing 10)
    Period: 2025-03-03..2025-03-09 (7 days)
    ");
    let table = preview_table(&result).to_string();
    assert!(table.contains("google_cpc"));
    assert!(table.contains("CampaignName"));
}

#[tokio::test]
async fn preview_reports_failed_sources_and_skipped_steps() {
    let dir = scratch("preview-partial");
    let definition = write_json(&dir, "report.json", &joined_definition());
    let mut fixture = Fixture::default();
    fixture.sources.insert("direct_1".into(), campaign_rows());
    fixture
        .failures
        .insert("metrika_2".into(), "quota exceeded".into());
    let data = write_json(&dir, "fixture.json", &fixture);

    let mut args = preview_args(definition, data);
    args.rows = Some(20);
    let PreviewOutcome::Preview(result) = run_preview(&args).await.unwrap() else {
        panic!("expected a preview");
    };
    insta::assert_snapshot!(preview_footer(&result), @r"
    Rows: 12
    Period: 2025-03-03..2025-03-09 (7 days)
    Source metrika_2 failed: request failed: quota exceeded
    Skipped global steps: 0
    ");
}

#[tokio::test]
async fn full_preview_runs_the_report() {
    let dir = scratch("preview-full");
    let definition = write_json(&dir, "report.json", &daily_definition());
    let mut fixture = Fixture::default();
    fixture.sources.insert("direct_1".into(), campaign_rows());
    let data = write_json(&dir, "fixture.json", &fixture);

    let mut args = preview_args(definition, data);
    args.full = true;
    let PreviewOutcome::Run(run) = run_preview(&args).await.unwrap() else {
        panic!("expected a run");
    };
    insta::assert_snapshot!(run_headline(&run), @"Run completed: 12 rows");
    assert_eq!(run.table.map(|table| table.data.len()), Some(12));
}

#[tokio::test]
async fn missing_fixture_rows_fail_every_source() {
    let dir = scratch("preview-empty");
    let definition = write_json(&dir, "report.json", &daily_definition());
    let data = write_json(&dir, "fixture.json", &Fixture::default());

    let err = run_preview(&preview_args(definition, data)).await.unwrap_err();
    assert_eq!(err.to_string(), "all 1 sources failed to fetch");
}

#[tokio::test]
async fn save_writes_numbered_reports() {
    let dir = scratch("save");
    let definition = write_json(&dir, "report.json", &daily_definition());
    let store_dir = dir.join("reports");
    let args = SaveArgs {
        definition,
        name: None,
        store_dir: store_dir.clone(),
        dates: dates(),
    };

    assert_eq!(run_save(&args).await.unwrap(), ReportId(1));
    assert_eq!(run_save(&args).await.unwrap(), ReportId(2));

    let text = fs::read_to_string(store_dir.join("report-2.json")).unwrap();
    let stored: StoredReport = serde_json::from_str(&text).unwrap();
    assert_eq!(stored.id, ReportId(2));
    assert_eq!(stored.name, "Daily clicks");
    assert_eq!(stored.definition.sources.len(), 1);
}

#[tokio::test]
async fn save_without_a_name_is_rejected() {
    let dir = scratch("save-unnamed");
    let mut unnamed = daily_definition();
    unnamed.name.clear();
    let definition = write_json(&dir, "report.json", &unnamed);
    let err = run_save(&SaveArgs {
        definition,
        name: None,
        store_dir: dir.join("reports"),
        dates: dates(),
    })
    .await
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "report definition is invalid: name: report name is required"
    );
    assert!(!dir.join("reports").join("report-1.json").exists());
}

#[tokio::test]
async fn catalog_degrades_failed_counters() {
    let dir = scratch("catalog");
    let mut fixture = Fixture {
        integrations: vec![
            Integration {
                kind: SourceKind::AdCampaigns,
                account: Some("agency".into()),
            },
            Integration {
                kind: SourceKind::AnalyticsCounter,
                account: None,
            },
        ],
        counters: vec![Counter {
            id: 42,
            name: "shop".into(),
            site: None,
        }],
        ..Default::default()
    };
    fixture
        .catalog_failures
        .insert("counters".into(), "token expired".into());
    let path = write_json(&dir, "fixture.json", &fixture);

    let snapshot = run_catalog(&CatalogArgs {
        fixture: path,
        project: 1,
    })
    .await
    .unwrap();
    assert!(snapshot.availability.is_available(SourceKind::AdCampaigns));
    assert!(!snapshot.availability.is_available(SourceKind::AnalyticsCounter));
    insta::assert_snapshot!(
        snapshot.warnings.join("\n"),
        @"Analytics counter catalog could not be loaded: request failed: token expired"
    );
    assert!(catalog_table(&snapshot).to_string().contains("Ad campaigns"));
}
