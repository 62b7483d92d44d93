//! CLI argument definitions for report-studio.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use report_model::PeriodSelector;

#[derive(Parser)]
#[command(
    name = "report-studio",
    version,
    about = "Build, validate and preview report definitions",
    long_about = "Validate report definitions, preview them against fixture data and\n\
                  save their submission form.\n\n\
                  Definitions and fixtures are JSON files in the persisted report shape."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a definition and list every issue found.
    Validate(ValidateArgs),

    /// Execute a definition against fixture data.
    Preview(PreviewArgs),

    /// Validate a definition for saving and store its submission form.
    Save(SaveArgs),

    /// Show which source kinds a project can build reports from.
    Catalog(CatalogArgs),

    /// Resolve a period selector to absolute dates.
    ResolvePeriod(PeriodArgs),

    /// Extract the spreadsheet id from a Google Sheets URL or bare id.
    SheetId {
        #[arg(value_name = "URL_OR_ID")]
        url: String,
    },
}

/// Date handling shared by commands that resolve periods.
#[derive(Args, Clone, Default)]
pub struct DateArgs {
    /// Resolve periods as of this date instead of the system clock.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub today: Option<NaiveDate>,

    /// Accept custom periods reaching past today.
    #[arg(long = "allow-future-dates")]
    pub allow_future_dates: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Report definition JSON file.
    #[arg(value_name = "DEFINITION")]
    pub definition: PathBuf,

    /// Validate for saving, which also requires a name.
    #[arg(long)]
    pub save: bool,

    /// Fixture whose catalogs decide which source kinds are available.
    #[arg(long, value_name = "FIXTURE")]
    pub catalog: Option<PathBuf>,

    #[command(flatten)]
    pub dates: DateArgs,
}

#[derive(Args)]
pub struct PreviewArgs {
    /// Report definition JSON file.
    #[arg(value_name = "DEFINITION")]
    pub definition: PathBuf,

    /// Fixture providing raw rows per source id.
    #[arg(long, value_name = "FIXTURE")]
    pub data: PathBuf,

    /// Execution options JSON file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Rows to show (overrides the configured preview limit).
    #[arg(long)]
    pub rows: Option<usize>,

    /// Run the whole report without the preview row limit or timeout.
    #[arg(long)]
    pub full: bool,

    /// Output format.
    #[arg(long = "output", value_enum, default_value = "table")]
    pub output: OutputFormatArg,

    #[command(flatten)]
    pub dates: DateArgs,
}

#[derive(Args)]
pub struct SaveArgs {
    /// Report definition JSON file.
    #[arg(value_name = "DEFINITION")]
    pub definition: PathBuf,

    /// Report name (defaults to the definition's own name).
    #[arg(long)]
    pub name: Option<String>,

    /// Directory that receives one JSON file per saved report.
    #[arg(long = "store-dir", value_name = "DIR")]
    pub store_dir: PathBuf,

    #[command(flatten)]
    pub dates: DateArgs,
}

#[derive(Args)]
pub struct CatalogArgs {
    /// Fixture providing integrations, campaigns and counters.
    #[arg(value_name = "FIXTURE")]
    pub fixture: PathBuf,

    #[arg(long, default_value_t = 1)]
    pub project: u64,
}

#[derive(Args)]
pub struct PeriodArgs {
    /// last_7_days, last_14_days, last_30_days, last_90_days, this_month,
    /// last_month or custom.
    #[arg(value_name = "SELECTOR")]
    pub selector: PeriodSelector,

    /// First day of a custom period.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub from: Option<NaiveDate>,

    /// Last day of a custom period.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub to: Option<NaiveDate>,

    #[command(flatten)]
    pub dates: DateArgs,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Table,
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
