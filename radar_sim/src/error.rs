// radar_sim/src/error.rs

use radar_core::error::ConfigError;
use thiserror::Error;

/// Errors raised while assembling the simulated bench, before any task runs.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid simulation setting '{name}': {reason}")]
    Simulation { name: &'static str, reason: String },
}
