// radar_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::error::{ConfigError, GeometryError, IoError, RadarError};
pub use crate::hardware::HardwareIo;

// --- Configuration ---
pub use crate::config::RadarConfig;

// --- Runtime (what a display or a binary talks to) ---
pub use crate::locator::{LaserCommand, LocateOutcome};
pub use crate::runtime::{RadarHandle, RadarRuntime};
pub use crate::snapshot::ScanSnapshot;

// --- Core Data Structures ---
pub use crate::geometry::TargetPoint;
pub use crate::track::{ContourElement, MeasurementTrack, TrackPoint};
