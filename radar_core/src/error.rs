// radar_core/src/error.rs

use thiserror::Error;

// =========================================================================
// == Hardware Errors ==
// =========================================================================

/// A failure reported by a `HardwareIo` driver. These are treated as transient
/// by the long-running loops and only escalate when they repeat.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IoError {
    #[error("write to pin {pin} failed: {reason}")]
    Write { pin: u8, reason: String },

    #[error("read from pin {pin} failed: {reason}")]
    Read { pin: u8, reason: String },

    #[error("device did not answer within its timeout")]
    Timeout,

    #[error("device is disconnected")]
    Disconnected,
}

// =========================================================================
// == Geometry Errors ==
// =========================================================================

/// Degenerate input to the target-locating trigonometry. Fatal to a single
/// locate call only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("target ({x}, {y}) is at the sweep rotation axis")]
    TargetAtOrigin { x: f64, y: f64 },

    #[error("target coincides with the laser mount position")]
    TargetAtLaser,

    #[error("laser reference axis has zero length")]
    ZeroLaserAxis,

    #[error("acos argument {ratio} is outside [-1, 1]")]
    OutOfDomain { ratio: f64 },
}

// =========================================================================
// == Configuration Errors ==
// =========================================================================

/// Invalid static configuration. Detected at startup before any hardware is
/// touched; there is no recovery.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sweep bounds are invalid: min_angle {min} must be below max_angle {max}")]
    InvalidSweepBounds { min: i32, max: i32 },

    #[error("{name} angle {value} is outside the servo range 0..=180")]
    AngleOutOfServoRange { name: &'static str, value: i32 },

    #[error("half cycle duration must be positive and finite, got {0}")]
    InvalidHalfCycle(f64),

    #[error("{name} must be positive and finite, got {value}")]
    InvalidNoise { name: &'static str, value: f64 },

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("laser mount ({x}, {y}) sits on the rotation axis")]
    LaserMountAtAxis { x: f64, y: f64 },

    #[error("laser clamp range is invalid: {min}..={max}")]
    InvalidLaserRange { min: i32, max: i32 },

    #[error("display range must be positive, got {0}")]
    InvalidDisplayRange(f64),

    #[error("window size must be positive, got {width}x{height}")]
    InvalidWindowSize { width: f32, height: f32 },

    #[error("pin {pin} is assigned to both {first} and {second}")]
    PinConflict {
        pin: u8,
        first: &'static str,
        second: &'static str,
    },

    #[error("failed to load configuration: {0}")]
    Load(String),
}

// =========================================================================
// == Top-Level Error ==
// =========================================================================

/// The error type surfaced by tasks, the locator and the runtime supervisor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RadarError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("task '{task}' gave up after {failures} consecutive hardware failures: {source}")]
    PersistentIo {
        task: &'static str,
        failures: u32,
        source: IoError,
    },

    #[error("task '{task}' panicked")]
    TaskPanicked { task: &'static str },

    #[error("task '{task}' did not stop within the shutdown grace period")]
    ShutdownTimeout { task: &'static str },

    #[error("failed to spawn task '{task}': {reason}")]
    Spawn { task: &'static str, reason: String },
}

pub type Result<T, E = RadarError> = std::result::Result<T, E>;
