//! Seamline allocator CLI
//!
//! Command-line entry point for the allocation engine. Reports go to stdout,
//! logs to stderr.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use seamline_shared::{AppConfig, AppError, OutputFormat};

use crate::cli::Cli;

fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => return report_failure(&anyhow::Error::from(AppError::from(err))),
    };

    init_tracing(cli.log.as_deref(), &config.log.filter);

    let format = cli.format.map_or(config.output.format, OutputFormat::from);

    match commands::run(&cli.command, &config).and_then(|report| render(&report, format)) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Command failed: {err:#}");
            report_failure(&err)
        }
    }
}

/// `--log` wins over `RUST_LOG`, which wins over the configured filter.
fn init_tracing(cli_filter: Option<&str>, config_filter: &str) {
    let filter = match cli_filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_filter)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn render(report: &Value, format: OutputFormat) -> anyhow::Result<String> {
    let output = match format {
        OutputFormat::Json => serde_json::to_string(report),
        OutputFormat::Pretty => serde_json::to_string_pretty(report),
    };
    output.map_err(|e| AppError::Internal(e.to_string()).into())
}

/// Failures without an `AppError` in their chain are reported as internal.
fn report_failure(err: &anyhow::Error) -> ExitCode {
    let fallback;
    let app = if let Some(app) = err.downcast_ref::<AppError>() {
        app
    } else {
        fallback = AppError::Internal(err.to_string());
        &fallback
    };

    eprintln!("{}: {err:#}", app.error_code());
    ExitCode::from(u8::try_from(app.exit_code()).unwrap_or(u8::MAX))
}
