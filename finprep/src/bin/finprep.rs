//! Command-line entry point for the preprocessing pipeline.

use anyhow::{Context, Result};
use clap::Parser;
use finprep::config::PipelineConfig;
use finprep::events::LoggingEventSink;
use finprep::observability::logging::parse_level;
use finprep::observability::{init_logging, LoggingConfig};
use finprep::pipeline::PipelineOrchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Anonymize, clean and normalize financial-profile records
#[derive(Parser, Debug)]
#[command(
    name = "finprep",
    version,
    about = "Anonymize, clean and normalize financial-profile records",
    long_about = "finprep loads records from a CSV file or an HTTP endpoint, redacts \
                  sensitive columns, removes outliers, keeps only the allow-listed \
                  columns and writes the normalized table plus a JSON run report.\n\n\
                  Examples:\n  \
                  finprep --input profiles.csv --output clean.csv\n  \
                  finprep --api-url http://127.0.0.1:8888/records --output clean.csv\n  \
                  finprep --config pipeline.json --input profiles.csv --json-logs"
)]
struct CliArgs {
    #[arg(short, long, value_name = "FILE", help = "Input CSV file")]
    input: Option<PathBuf>,

    #[arg(short, long, value_name = "FILE", help = "Where to write the processed CSV")]
    output: Option<PathBuf>,

    #[arg(short, long, value_name = "FILE", help = "JSON pipeline configuration")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "URL",
        help = "Fetch records from this URL when no input file is given"
    )]
    api_url: Option<String>,

    #[arg(long, value_name = "FILE", help = "Override the report path")]
    report: Option<PathBuf>,

    #[arg(long, help = "Emit logs as JSON lines")]
    json_logs: bool,

    #[arg(long, value_name = "LEVEL", default_value = "info", help = "Set logging level")]
    log_level: String,
}

fn load_config(args: &CliArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(url) = &args.api_url {
        config = config.with_api_url(url);
    }
    if let Some(report) = &args.report {
        config = config.with_report_path(report);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let mut logging = LoggingConfig::with_level(parse_level(&args.log_level));
    if args.json_logs {
        logging = logging.json();
    }
    init_logging(logging);
    debug!(?args, "Arguments");

    let config = load_config(&args)?;
    let orchestrator = PipelineOrchestrator::new(config)
        .context("Invalid pipeline configuration")?
        .with_event_sink(Arc::new(LoggingEventSink::debug()));

    let run = orchestrator
        .run(args.input.as_deref(), args.output.as_deref())
        .await
        .context("Pipeline failed")?;

    let (rows, cols) = run.table.shape();
    info!(rows, cols, errors = run.context.errors().len(), "Done");
    if let Some(summary) = &run.compliance {
        println!("{summary}");
    }
    for error in run.context.errors() {
        eprintln!("warning: {error}");
    }
    Ok(())
}
