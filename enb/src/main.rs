//! LTE eNodeB Simulation Main Application
//!
//! Entry point for the discrete-event downlink simulation: loads the TOML
//! configuration, applies CLI overrides, wires the scenario and runs it.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod scenario;

use config::SimConfig;
use scenario::Scenario;

/// LTE eNodeB discrete-event simulation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Number of radio frames to simulate
    #[arg(long)]
    frames: Option<u32>,

    /// Number of attached terminals
    #[arg(long)]
    ues: Option<u16>,

    /// Number of downlink resource blocks (6, 15, 25, 50, 75, 100)
    #[arg(long)]
    num_rbs: Option<u16>,

    /// Total transmit power in dBm
    #[arg(long)]
    tx_power_dbm: Option<f64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    let mut config = match &args.config {
        Some(path) => SimConfig::from_toml_file(path)?,
        None => SimConfig::default(),
    };

    // CLI overrides
    if let Some(frames) = args.frames {
        config.run.frames = frames;
    }
    if let Some(ues) = args.ues {
        config.run.ues = ues;
    }
    if let Some(num_rbs) = args.num_rbs {
        config.cell.num_rbs = num_rbs;
    }
    if let Some(tx_power_dbm) = args.tx_power_dbm {
        config.cell.tx_power_dbm = tx_power_dbm;
    }

    info!("Starting LTE eNodeB simulation");
    info!("Cell configuration:");
    info!("  Cell ID: {}", config.cell.cell_id);
    info!("  Carrier: {} Hz", config.cell.carrier_frequency_hz);
    info!("  Resource blocks: {}", config.cell.num_rbs);
    info!("  TX power: {} dBm", config.cell.tx_power_dbm);
    info!("  UE noise figure: {} dB", config.cell.noise_figure_db);
    info!("Run: {} frames, {} UEs", config.run.frames, config.run.ues);

    let summary = Scenario::build(&config)?.run();

    info!(
        "Run complete: {} frames, {} PDUs transmitted, {} delivered, {} CQI reports",
        summary.frames_completed,
        summary.pdus_sent,
        summary.pdus_delivered,
        summary.cqi_reports
    );

    Ok(())
}
