//! Command-line front end for the motion-core simulation harness.
//!
//! Loads a machine configuration, submits a straight-line move, runs the
//! planner/runtime pipeline to completion, and writes the resulting step
//! trace to disk.

use anyhow::Result;
use clap::Parser;
use motion_sim::{default_table, MachineConfigFile, SimHarness};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "motion-sim", about = "Simulate a motion-core planner run and record its step trace")]
struct Cli {
    /// Path to a TOML machine configuration. Falls back to built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target X position in mm.
    #[arg(long, default_value_t = 50.0)]
    x: f32,
    /// Target Y position in mm.
    #[arg(long, default_value_t = 0.0)]
    y: f32,
    /// Target Z position in mm.
    #[arg(long, default_value_t = 0.0)]
    z: f32,

    #[arg(long, default_value_t = 500.0)]
    feed_rate: f32,
    #[arg(long, default_value_t = 2000.0)]
    accel: f32,

    /// Where to write the recorded step trace as JSON.
    #[arg(long, default_value = "trace.json")]
    out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let table = match &cli.config {
        Some(path) => {
            let mut table = motion_core::ConfigTable::default();
            MachineConfigFile::load(path)?.apply(&mut table)?;
            table
        }
        None => default_table(),
    };

    let mut harness = SimHarness::new(table);
    let mut target = [0.0; motion_core::NUM_AXES];
    target[0] = cli.x;
    target[1] = cli.y;
    target[2] = cli.z;

    harness.submit_line(target, cli.feed_rate, cli.accel)?;
    harness.run_to_completion()?;

    info!(position = ?harness.position(), steps = harness.trace().entries.len(), "simulation complete");
    harness.trace().dump(&cli.out)?;
    info!(path = %cli.out.display(), "trace written");

    Ok(())
}
