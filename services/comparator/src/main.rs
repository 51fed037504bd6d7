//! Climatology comparator.
//!
//! Compares two monthly climatologies over the land cells of a land-sea
//! mask and reports the bias overall, per month, and split into coastal and
//! inland cells.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use grid_processor::{pipeline, ComparatorConfig};

#[derive(Parser, Debug)]
#[command(name = "comparator")]
#[command(about = "Land bias between two monthly climatologies")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "COMPARATOR_CONFIG", default_value = "config/compare.yaml")]
    config: PathBuf,

    /// Write the JSON report here instead of the configured path
    #[arg(short, long)]
    report: Option<PathBuf>,

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

    info!(config = %args.config.display(), "Starting climatology comparator");

    let mut config = ComparatorConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if args.report.is_some() {
        config.report_path = args.report;
    }

    let comparison = pipeline::compare(&config).with_context(|| {
        format!(
            "comparing {} against {}",
            config.field_a.name, config.field_b.name
        )
    })?;

    let report = &comparison.report;
    info!(
        all = ?report.overall.all,
        coastal = ?report.overall.coastal,
        inland = ?report.overall.inland,
        land_cells = report.cells.land,
        coastal_cells = report.cells.coastal,
        hot_coastal_cells = report.cells.hot_coastal,
        "Mean bias over land"
    );

    // Without a report path the report goes to stdout
    if config.report_path.is_none() {
        println!("{}", report.to_json()?);
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
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}
