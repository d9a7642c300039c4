//! RateBridge Binary
//!
//! Publishes the derived exchange rate table once and exits.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratebridge_fx::ReportFormat;
use ratebridge_runner::{run, RunnerConfig, SinkTarget};

/// RateBridge CLI
#[derive(Parser, Debug)]
#[command(name = "ratebridge")]
#[command(about = "Derive and publish a complete exchange rate table from two bank feeds")]
struct Args {
    /// Compute and report, printing records to stdout instead of the configured sink
    #[arg(long)]
    dry_run: bool,

    /// Lock file guarding against concurrent runs
    #[arg(long)]
    lock_path: Option<PathBuf>,

    /// Report format (text or html)
    #[arg(long)]
    report_format: Option<ReportFormat>,

    /// Write the report to this file instead of stdout
    #[arg(long)]
    report_path: Option<PathBuf>,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = RunnerConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    init_logging(config.log_json);

    if args.dry_run {
        config.sink = SinkTarget::Stdout;
    }
    if let Some(path) = args.lock_path {
        config.lock_path = path;
    }
    if let Some(format) = args.report_format {
        config.report.format = format;
    }
    if let Some(path) = args.report_path {
        config.report.path = Some(path);
    }

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    info!(
        base = %config.base,
        required = %config.required,
        primary = %config.primary.name,
        secondary = %config.secondary.name,
        dry_run = args.dry_run,
        "Starting RateBridge"
    );

    match run(&config).await {
        Ok((outcome, persisted)) => {
            info!(
                run_id = %outcome.run_id,
                records = outcome.records.len(),
                persisted = persisted.persisted,
                "RateBridge finished"
            );
            Ok(())
        }
        Err(e) if e.is_fatal() => {
            error!(code = e.error_code(), error = %e, "RateBridge aborted");
            Err(e.into())
        }
        Err(e) => {
            warn!(code = e.error_code(), error = %e, "RateBridge finished with publishing errors");
            Err(e.into())
        }
    }
}
