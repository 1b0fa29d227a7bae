use anyhow::{Context, Result};
use clap::Parser;
use colorpref_analysis::{LogContents, Report, ValidityWindow};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Summarize a colorpref trial log.
#[derive(Debug, Parser)]
#[command(name = "colorpref-report", version)]
struct Args {
    /// Trial log written by the experiment.
    log: PathBuf,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Latencies at or below this many seconds are discarded.
    #[arg(long, default_value_t = ValidityWindow::default().lower)]
    min_rt: f64,

    /// Latencies at or above this many seconds are discarded.
    #[arg(long, default_value_t = ValidityWindow::default().upper)]
    max_rt: f64,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let log = LogContents::read(&args.log)
        .with_context(|| format!("failed to read {}", args.log.display()))?;
    info!(
        breaking = log.breaking.len(),
        orientation = log.orientation.len(),
        skipped = log.skipped,
        "loaded trial log"
    );

    let window = ValidityWindow {
        lower: args.min_rt,
        upper: args.max_rt,
    };
    let report = Report::build(&log, window);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
