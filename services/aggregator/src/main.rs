//! Climatology aggregator.
//!
//! Loads the raw time series of every configured source, restricts them to
//! their common time window, and writes one monthly climatology per source.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use grid_processor::{pipeline, AggregatorConfig};

#[derive(Parser, Debug)]
#[command(name = "aggregator")]
#[command(about = "Monthly climatologies of gridded sources over their common time window")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "AGGREGATOR_CONFIG", default_value = "config/aggregate.yaml")]
    config: PathBuf,

    /// Override the configured output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    info!(config = %args.config.display(), "Starting climatology aggregator");

    let mut config = AggregatorConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    info!(
        sources = ?config.sources.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        output_dir = %config.output_dir.display(),
        "Loaded configuration"
    );

    let outputs = pipeline::aggregate(&config).context("aggregation failed")?;

    for output in &outputs {
        info!(
            source = %output.source,
            path = %output.path.display(),
            samples = output.samples,
            start = %output.window.start,
            end = %output.window.end,
            "Climatology ready"
        );
    }

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}
