// radar_sim/src/cli.rs

use bevy::prelude::Resource;
use clap::Parser;
use std::path::PathBuf;

/// Sonar radar bench: a sweeping ultrasonic range finder with a
/// click-to-aim laser, driven against a simulated board.
#[derive(Parser, Debug, Resource, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the radar TOML file. A missing file means all defaults.
    #[arg(short, long, default_value = "assets/radar.toml")]
    pub config: PathBuf,

    /// Run without a window, logging scan snapshots instead.
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// How long a headless run lasts (in seconds).
    #[arg(long, default_value_t = 10.0)]
    pub duration: f64,

    /// Seed for the simulated board's noise. Overrides the config file.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Aim the laser at X_CM Y_CM (sensor frame) once the radar is up.
    #[arg(
        long,
        num_args = 2,
        value_names = ["X_CM", "Y_CM"],
        allow_negative_numbers = true
    )]
    pub target: Option<Vec<f64>>,

    /// Log filter in `tracing` env-filter syntax.
    #[arg(long, default_value = "info,wgpu_core=error,wgpu_hal=error,radar_core=debug,radar_sim=debug")]
    pub log_filter: String,
}

impl Cli {
    /// The `--target` pair, if one was given.
    pub fn target_point(&self) -> Option<(f64, f64)> {
        match self.target.as_deref() {
            Some(&[x, y]) => Some((x, y)),
            _ => None,
        }
    }
}
