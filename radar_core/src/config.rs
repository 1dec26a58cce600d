// radar_core/src/config.rs

use serde::Deserialize;
use std::time::Duration;

use crate::error::ConfigError;

/// Physical servo travel. Every commanded servo angle must fall in this range.
pub const SERVO_MIN_DEG: i32 = 0;
pub const SERVO_MAX_DEG: i32 = 180;

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # RadarConfig
/// Immutable process-wide constants, loaded once at startup. Every section
/// falls back to the bench defaults when it is missing from the file.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RadarConfig {
    pub board: BoardConfig,
    pub sweep: SweepConfig,
    pub sonar: SonarConfig,
    pub filter: FilterConfig,
    pub laser: LaserConfig,
    pub display: DisplayConfig,
    pub runtime: RuntimeConfig,
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Serial port identifier of the microcontroller board.
    pub port: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            port: "COM7".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Pin of the servo carrying the sonar.
    pub servo_pin: u8,
    /// Lowest angle reached by the sweep (in degrees).
    pub min_angle: i32,
    /// Highest angle reached by the sweep (in degrees).
    pub max_angle: i32,
    /// Time to travel from `min_angle` to `max_angle` (in seconds).
    pub half_cycle_secs: f64,
    /// Angle between the servo's zero and the true zero of the sonar (in degrees).
    pub offset_angle_deg: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            servo_pin: 2,
            min_angle: 0,
            max_angle: 180,
            half_cycle_secs: 4.0,
            offset_angle_deg: 0.0,
        }
    }
}

impl SweepConfig {
    /// Per-degree delay: `half_cycle / (max_angle - min_angle)`.
    /// Only meaningful on a validated config.
    pub fn step_time(&self) -> Duration {
        let steps = (self.max_angle - self.min_angle).max(1) as f64;
        Duration::from_secs_f64(self.half_cycle_secs / steps)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SonarConfig {
    pub trigger_pin: u8,
    pub echo_pin: u8,
    /// Distance from the servo axis to the face of the sonar (in cm).
    pub mount_offset_cm: f64,
    /// Delay between two sonar reads (in milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            trigger_pin: 5,
            echo_pin: 4,
            mount_offset_cm: 1.6,
            poll_interval_ms: 10,
        }
    }
}

impl SonarConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Process noise covariance.
    pub q: f64,
    /// Measurement noise covariance.
    pub r: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { q: 1e-2, r: 2.92e-4 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LaserConfig {
    pub servo_pin: u8,
    pub output_pin: u8,
    /// Laser servo axis relative to the sweep servo axis (in cm).
    pub mount_x_cm: f64,
    pub mount_y_cm: f64,
    /// Angle between the laser servo's zero and the true zero (in degrees).
    pub offset_angle_deg: f64,
    /// Commanded laser angles are clamped to this range.
    pub min_angle: i32,
    pub max_angle: i32,
    /// Wait after the rotate command before the laser turns on (in milliseconds).
    pub settle_ms: u64,
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            servo_pin: 6,
            output_pin: 8,
            mount_x_cm: 7.5,
            mount_y_cm: 0.0,
            offset_angle_deg: 10.0,
            min_angle: SERVO_MIN_DEG,
            max_angle: SERVO_MAX_DEG,
            settle_ms: 100,
        }
    }
}

/// Display geometry. Only the radar window reads this section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub window_width: f32,
    pub window_height: f32,
    /// Maximum plotted range; readings beyond it are not drawn (in cm).
    pub max_range_cm: f64,
    /// Adjacent track points closer than this are joined by a segment (in px).
    pub contour_link_px: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_width: 1200.0,
            window_height: 600.0,
            max_range_cm: 30.0,
            contour_link_px: 50.0,
        }
    }
}

impl DisplayConfig {
    /// Centimetres per pixel.
    pub fn scale(&self) -> f64 {
        self.max_range_cm / self.window_height as f64
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Consecutive hardware failures tolerated before a loop gives up.
    pub max_consecutive_io_failures: u32,
    /// Upper bound on the stop-and-join phase at exit (in milliseconds).
    pub shutdown_grace_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_consecutive_io_failures: 3,
            shutdown_grace_ms: 6000,
        }
    }
}

impl RuntimeConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

// =========================================================================
// == Validation ==
// =========================================================================

impl RadarConfig {
    /// Checks every startup precondition. Called before any hardware is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sweep = &self.sweep;
        for (name, value) in [("min_angle", sweep.min_angle), ("max_angle", sweep.max_angle)] {
            if !(SERVO_MIN_DEG..=SERVO_MAX_DEG).contains(&value) {
                return Err(ConfigError::AngleOutOfServoRange { name, value });
            }
        }
        if sweep.min_angle >= sweep.max_angle {
            return Err(ConfigError::InvalidSweepBounds {
                min: sweep.min_angle,
                max: sweep.max_angle,
            });
        }
        if !(sweep.half_cycle_secs.is_finite() && sweep.half_cycle_secs > 0.0) {
            return Err(ConfigError::InvalidHalfCycle(sweep.half_cycle_secs));
        }

        for (name, value) in [("filter.q", self.filter.q), ("filter.r", self.filter.r)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidNoise { name, value });
            }
        }
        if self.sonar.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("sonar.poll_interval_ms"));
        }

        let laser = &self.laser;
        if laser.mount_x_cm == 0.0 && laser.mount_y_cm == 0.0 {
            return Err(ConfigError::LaserMountAtAxis {
                x: laser.mount_x_cm,
                y: laser.mount_y_cm,
            });
        }
        if laser.min_angle > laser.max_angle
            || laser.min_angle < SERVO_MIN_DEG
            || laser.max_angle > SERVO_MAX_DEG
        {
            return Err(ConfigError::InvalidLaserRange {
                min: laser.min_angle,
                max: laser.max_angle,
            });
        }

        let display = &self.display;
        if [display.window_width, display.window_height]
            .iter()
            .any(|side| !(side.is_finite() && *side > 0.0))
        {
            return Err(ConfigError::InvalidWindowSize {
                width: display.window_width,
                height: display.window_height,
            });
        }
        if !(self.display.max_range_cm.is_finite() && self.display.max_range_cm > 0.0) {
            return Err(ConfigError::InvalidDisplayRange(self.display.max_range_cm));
        }
        if self.runtime.max_consecutive_io_failures == 0 {
            return Err(ConfigError::ZeroInterval(
                "runtime.max_consecutive_io_failures",
            ));
        }

        self.check_pin_ownership()
    }

    /// Each physical pin belongs to exactly one role.
    fn check_pin_ownership(&self) -> Result<(), ConfigError> {
        let roles = [
            ("sweep servo", self.sweep.servo_pin),
            ("sonar trigger", self.sonar.trigger_pin),
            ("sonar echo", self.sonar.echo_pin),
            ("laser servo", self.laser.servo_pin),
            ("laser output", self.laser.output_pin),
        ];
        for (i, (first, pin)) in roles.iter().enumerate() {
            if let Some((second, _)) = roles[i + 1..].iter().find(|(_, other)| other == pin) {
                return Err(ConfigError::PinConflict {
                    pin: *pin,
                    first: *first,
                    second: *second,
                });
            }
        }
        Ok(())
    }
}
