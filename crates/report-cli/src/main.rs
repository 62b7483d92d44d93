//! report-studio CLI.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use report_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg, OutputFormatArg};
use report_cli::commands::{
    PreviewOutcome, run_catalog, run_preview, run_resolve_period, run_save, run_sheet_id,
    run_validate,
};
use report_cli::logging::{LogConfig, LogFormat, init_logging};
use report_cli::summary::{print_catalog, print_preview, print_run, print_validation};
use report_core::ExecutionError;
use report_model::RunStatus;
use tracing::error;
use tracing::level_filters::LevelFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let outcome = match &cli.command {
        Command::Validate(args) => run_validate(args).await.map(|report| {
            print_validation(&report);
            i32::from(!report.is_valid())
        }),
        Command::Preview(args) => run_preview(args).await.and_then(|outcome| match outcome {
            PreviewOutcome::Preview(result) => {
                match args.output {
                    OutputFormatArg::Table => print_preview(&result),
                    OutputFormatArg::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                }
                Ok(0)
            }
            PreviewOutcome::Run(run) => {
                match args.output {
                    OutputFormatArg::Table => print_run(&run),
                    OutputFormatArg::Json => println!("{}", serde_json::to_string_pretty(&run.table)?),
                }
                Ok(i32::from(run.record.status == RunStatus::Failed))
            }
        }),
        Command::Save(args) => run_save(args).await.map(|id| {
            println!("Saved report {id}");
            0
        }),
        Command::Catalog(args) => run_catalog(args).await.map(|snapshot| {
            print_catalog(&snapshot);
            0
        }),
        Command::ResolvePeriod(args) => run_resolve_period(args).map(|range| {
            println!("{range}");
            0
        }),
        Command::SheetId { url } => {
            println!("{}", run_sheet_id(url));
            Ok(0)
        }
    };

    let exit_code = match outcome {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            match err.downcast_ref::<ExecutionError>() {
                Some(ExecutionError::Invalid(report)) => print_validation(report),
                Some(ExecutionError::Timeout { .. }) => eprintln!("error: {err} (retry later)"),
                _ => eprintln!("error: {err:#}"),
            }
            1
        }
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
