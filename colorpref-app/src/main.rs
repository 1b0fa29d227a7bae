mod host;
mod keys;
mod rig;

use anyhow::{Context, Result};
use clap::Parser;
use colorpref_experiment::{Session, SessionConfig, TrialLog};
use colorpref_timing::HighPrecisionTimer;
use rig::WindowRig;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Binocular-suppression color preference session.
#[derive(Debug, Parser)]
#[command(name = "colorpref", version)]
struct Args {
    /// JSON session configuration; missing fields take the canonical values.
    config: Option<PathBuf>,

    /// Run in a window instead of borderless fullscreen.
    #[arg(long)]
    windowed: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SessionConfig::default(),
    };
    config.validate()?;

    println!("=== COLOR PREFERENCE EXPERIMENT ===");
    let mut rig = WindowRig::open(&config.assets, config.refresh_rate, !args.windowed)?;
    rig.describe();
    println!("Press ESC at any time to abort.\n");

    match rig.self_check(config.refresh_rate) {
        Ok(_) => {}
        Err(e) if e.is_abort() => {
            warn!("session aborted during the display check");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let log = TrialLog::append(&config.output_path)
        .with_context(|| format!("failed to open {}", config.output_path.display()))?;
    info!(path = %config.output_path.display(), "appending to trial log");

    let mut session = Session::new(config, rig, HighPrecisionTimer::new(), rand::rng(), log)?;
    match session.run() {
        Ok(summary) => {
            info!(
                breaking_trials = summary.breaking_trials,
                orientation_trials = summary.orientation_trials,
                prime_reports = summary.prime_reports,
                tilt = summary.tilt,
                "session complete"
            );
            println!("\nExperiment completed. Thank you!");
        }
        Err(e) if e.is_abort() => warn!(stage = ?session.stage(), "session aborted by subject"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
