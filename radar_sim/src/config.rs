// radar_sim/src/config.rs

//! Loading and validating the bench configuration from disk.

use figment::{
    providers::{Format, Toml},
    Figment,
};
use radar_core::config::RadarConfig;
use serde::Deserialize;
use std::path::Path;

use crate::error::SimError;

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # AppConfig
/// The root of a `radar.toml` file: the radar itself plus the simulated scene
/// its sonar looks at.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub radar: RadarConfig,
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Reads `path` (a missing file means "all defaults") and validates the
    /// result. Nothing here touches the hardware.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file(path))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.radar.validate()?;
        self.simulation.validate()
    }
}

// =========================================================================
// == Simulation Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Optional seed for the noise generator, for repeatable runs.
    pub seed: Option<u64>,
    /// Standard deviation of the Gaussian range noise (in cm).
    pub range_noise_stddev_cm: f64,
    /// Chance that a ping returns no echo.
    pub miss_probability: f64,
    /// Chance that any single board operation fails.
    pub io_failure_probability: f64,
    /// Echoes from beyond this range are lost (in cm).
    pub max_echo_range_cm: f64,
    /// Delay added to every sonar read (in milliseconds).
    pub io_latency_ms: u64,
    #[serde(default = "default_obstacles")]
    pub obstacles: Vec<Obstacle>,
}

/// A round obstacle in the sensor frame (in cm).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Obstacle {
    pub x_cm: f64,
    pub y_cm: f64,
    pub radius_cm: f64,
}

fn default_obstacles() -> Vec<Obstacle> {
    vec![
        Obstacle {
            x_cm: -12.0,
            y_cm: 14.0,
            radius_cm: 3.0,
        },
        Obstacle {
            x_cm: 10.0,
            y_cm: 20.0,
            radius_cm: 5.0,
        },
        Obstacle {
            x_cm: 24.0,
            y_cm: 6.0,
            radius_cm: 2.0,
        },
    ]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            range_noise_stddev_cm: 0.3,
            miss_probability: 0.02,
            io_failure_probability: 0.0,
            max_echo_range_cm: 400.0,
            io_latency_ms: 0,
            obstacles: default_obstacles(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        let invalid = |name, reason: String| Err(SimError::Simulation { name, reason });

        if !(self.range_noise_stddev_cm.is_finite() && self.range_noise_stddev_cm >= 0.0) {
            return invalid(
                "range_noise_stddev_cm",
                format!("{} is not a valid standard deviation", self.range_noise_stddev_cm),
            );
        }
        for (name, p) in [
            ("miss_probability", self.miss_probability),
            ("io_failure_probability", self.io_failure_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(name, format!("{p} is not a probability"));
            }
        }
        if !(self.max_echo_range_cm.is_finite() && self.max_echo_range_cm > 0.0) {
            return invalid(
                "max_echo_range_cm",
                format!("{} must be positive", self.max_echo_range_cm),
            );
        }
        if let Some(bad) = self
            .obstacles
            .iter()
            .find(|o| !o.radius_cm.is_finite() || o.radius_cm <= 0.0)
        {
            return invalid(
                "obstacles",
                format!("obstacle at ({}, {}) has no positive radius", bad.x_cm, bad.y_cm),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_core::error::ConfigError;

    #[test]
    fn defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let config: AppConfig = toml::from_str(
            r#"
            [radar.sweep]
            max_angle = 120
            half_cycle_secs = 2.0

            [simulation]
            seed = 7
            obstacles = [{ x_cm = 0.0, y_cm = 15.0, radius_cm = 2.5 }]
            "#,
        )
        .unwrap();

        assert_eq!(config.radar.sweep.max_angle, 120);
        assert_eq!(config.radar.sweep.min_angle, 0);
        assert_eq!(config.radar.filter, RadarConfig::default().filter);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.obstacles.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed = toml::from_str::<AppConfig>(
            r#"
            [radar.sweep]
            max_angel = 120
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn invalid_radar_section_fails_validation() {
        let config: AppConfig = toml::from_str(
            r#"
            [radar.filter]
            q = 0.0
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(SimError::Config(ConfigError::InvalidNoise { name: "filter.q", .. }))
        ));
    }

    #[test]
    fn probabilities_are_bounded() {
        let config = AppConfig {
            simulation: SimulationConfig {
                miss_probability: 1.5,
                ..SimulationConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimError::Simulation { name: "miss_probability", .. })
        ));
    }

    #[test]
    fn missing_file_means_defaults() {
        let config = AppConfig::load(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
