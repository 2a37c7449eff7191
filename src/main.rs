use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use anchor_tracker_rs::{AnchorTracker, FilteredEstimate, RawFix, TrackerConfig, TrackerSnapshot};

#[derive(Parser, Debug)]
#[command(name = "anchor_tracker")]
#[command(about = "Replay a recorded fix log through the position filter and update gate", long_about = None)]
struct Args {
    /// Path to a fix log (.json or .json.gz). An altitude of 0 is read as unknown
    #[arg(long)]
    log: PathBuf,

    /// JSON tracker config; missing fields fall back to defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override gate minimum distance (meters)
    #[arg(long)]
    min_distance: Option<f64>,

    /// Override gate maximum interval (seconds)
    #[arg(long)]
    max_interval: Option<f64>,

    /// Reset the tracker when a fix jumps this far (meters)
    #[arg(long)]
    recalibrate_jump: Option<f64>,

    /// Write a JSON report with every accepted update
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Deserialize)]
struct FixLog {
    fixes: Vec<RawFix>,
}

#[derive(Serialize)]
struct ReplayReport {
    generated_at: String,
    source: String,
    config: TrackerConfig,
    snapshot: TrackerSnapshot,
    updates: Vec<FilteredEstimate>,
}

fn open_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let parsed = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        serde_json::from_reader(BufReader::new(GzDecoder::new(file)))?
    } else {
        serde_json::from_reader(BufReader::new(file))?
    };
    Ok(parsed)
}

fn load_config(args: &Args) -> Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => open_json(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(d) = args.min_distance {
        config.gate.min_distance_m = d;
    }
    if let Some(t) = args.max_interval {
        config.gate.max_interval_secs = t;
    }
    if args.recalibrate_jump.is_some() {
        config.recalibrate_jump_m = args.recalibrate_jump;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(&args)?;
    let log: FixLog = open_json(&args.log)?;
    let mut tracker = AnchorTracker::new(config.clone())?;

    println!("[{}] Replaying {} fixes from {}", ts_now(), log.fixes.len(), args.log.display());

    let updates: Vec<FilteredEstimate> = log
        .fixes
        .iter()
        .filter_map(|fix| tracker.process(*fix).into_estimate())
        .collect();

    let snapshot = tracker.snapshot();

    println!("\n=== Replay Stats ===");
    println!("Fixes processed:  {}", snapshot.fixes_processed);
    println!("Skipped:          {}", snapshot.skipped);
    println!("Accepted:         {}", snapshot.accepted);
    println!("Rejected:         {}", snapshot.rejected);
    println!("Efficiency ratio: {:.3}", snapshot.efficiency_ratio);
    println!("Recalibrations:   {}", snapshot.recalibrations);
    if let Some(est) = snapshot.current_estimate.as_ref() {
        println!(
            "Final estimate:   ({:.7}, {:.7}) alt={}",
            est.latitude,
            est.longitude,
            est.altitude
                .map(|a| format!("{a:.1}m"))
                .unwrap_or_else(|| "n/a".to_string())
        );
    }

    if let Some(path) = &args.output {
        let report = ReplayReport {
            generated_at: Utc::now().to_rfc3339(),
            source: args.log.display().to_string(),
            config,
            snapshot,
            updates,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("[{}] Report written to {}", ts_now(), path.display());
    }

    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
