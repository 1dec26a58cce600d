// radar_core/src/estimation/kalman.rs

use crate::config::FilterConfig;
use crate::error::ConfigError;

/// The complete state of the scalar filter. Owned by the estimator loop and
/// never shared; only the derived distance is published.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    /// The current estimate `Xk`.
    pub estimate: f64,
    /// The estimate covariance `Pk`.
    pub covariance: f64,
    /// The last Kalman gain `Kk`.
    pub gain: f64,
    /// The process noise covariance `Q`.
    pub process_noise: f64,
    /// The measurement noise covariance `R`.
    pub measurement_noise: f64,
}

/// A one-dimensional Kalman filter for a static quantity observed directly
/// (`F = 1`, `H = 1`, no control input).
#[derive(Debug, Clone)]
pub struct ScalarKalmanFilter {
    state: FilterState,
}

impl ScalarKalmanFilter {
    /// Creates a filter with `Xk = 0`, `Pk = 0`, `Kk = 0`.
    ///
    /// `q` must be non-negative and `r` strictly positive, both finite;
    /// together they keep `Pk` non-negative and the gain well defined.
    pub fn new(q: f64, r: f64) -> Result<Self, ConfigError> {
        Self::with_prior(0.0, 0.0, q, r)
    }

    /// Creates a filter starting from an explicit prior.
    pub fn with_prior(estimate: f64, covariance: f64, q: f64, r: f64) -> Result<Self, ConfigError> {
        if !(q.is_finite() && q >= 0.0) {
            return Err(ConfigError::InvalidNoise {
                name: "process noise",
                value: q,
            });
        }
        if !(r.is_finite() && r > 0.0) {
            return Err(ConfigError::InvalidNoise {
                name: "measurement noise",
                value: r,
            });
        }
        if !(covariance.is_finite() && covariance >= 0.0) {
            return Err(ConfigError::InvalidNoise {
                name: "initial covariance",
                value: covariance,
            });
        }

        Ok(Self {
            state: FilterState {
                estimate,
                covariance,
                gain: 0.0,
                process_noise: q,
                measurement_noise: r,
            },
        })
    }

    /// Returns to `Xk = 0`, `Pk = 0`, `Kk = 0`, keeping `Q` and `R`.
    pub fn reset(&mut self) {
        self.state.estimate = 0.0;
        self.state.covariance = 0.0;
        self.state.gain = 0.0;
    }

    /// Predict: `Xk = F * Xk` with `F = 1`, `Pk = Pk + Q`.
    pub fn predict(&mut self) {
        self.state.covariance += self.state.process_noise;
    }

    /// Gain then correction with the measurement `yk`.
    pub fn correct(&mut self, yk: f64) {
        let s = &mut self.state;
        s.gain = s.covariance / (s.covariance + s.measurement_noise);
        s.estimate += s.gain * (yk - s.estimate);
        s.covariance *= 1.0 - s.gain;
    }

    /// One full cycle. A missing measurement still runs the predict step, so
    /// the uncertainty grows while the estimate holds.
    pub fn step(&mut self, measurement: Option<f64>) -> f64 {
        self.predict();
        if let Some(yk) = measurement {
            self.correct(yk);
        }
        self.state.estimate
    }

    pub fn estimate(&self) -> f64 {
        self.state.estimate
    }

    pub fn covariance(&self) -> f64 {
        self.state.covariance
    }

    pub fn gain(&self) -> f64 {
        self.state.gain
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }
}

/// A zeroed filter with the bench's default `Q` and `R`.
impl Default for ScalarKalmanFilter {
    fn default() -> Self {
        let noise = FilterConfig::default();
        Self {
            state: FilterState {
                estimate: 0.0,
                covariance: 0.0,
                gain: 0.0,
                process_noise: noise.q,
                measurement_noise: noise.r,
            },
        }
    }
}
