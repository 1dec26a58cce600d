// radar_core/src/estimation/range.rs

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::kalman::ScalarKalmanFilter;
use crate::config::RadarConfig;
use crate::error::{ConfigError, RadarError};
use crate::hardware::HardwareIo;
use crate::snapshot::{Published, ScanSnapshot, ScanSnapshotBus};
use crate::task::StopSignal;

const TASK: &str = "range-estimator";

/// Turns a raw sonar reading into a usable measurement. Zero, negative and
/// non-finite values are the sensor's way of saying "no echo" and must not
/// drag the estimate toward zero.
pub fn usable_sample(raw: Option<f64>) -> Option<f64> {
    raw.filter(|d| d.is_finite() && *d > 0.0)
}

/// Polls the sonar at a fixed cadence, smooths the readings with a scalar
/// Kalman filter and publishes the filtered range (mount offset included).
///
/// Each cycle also pairs the fresh distance with the latest sweep angle and
/// publishes it on the scan bus for the display.
pub struct RangeEstimator {
    trigger_pin: u8,
    poll_interval: Duration,
    mount_offset_cm: f64,
    filter: ScalarKalmanFilter,
    /// Set once a real echo has been corrected in since the last `initialize`.
    has_estimate: bool,
    hardware: Arc<dyn HardwareIo>,
    distance: Published<f64>,
    sweep_angle: Published<i32>,
    bus: ScanSnapshotBus,
    max_consecutive_failures: u32,
    consecutive_failures: u32,
}

impl RangeEstimator {
    pub fn new(
        config: &RadarConfig,
        hardware: Arc<dyn HardwareIo>,
        sweep_angle: Published<i32>,
        bus: ScanSnapshotBus,
    ) -> Result<Self, ConfigError> {
        let mount_offset_cm = config.sonar.mount_offset_cm;
        let mut estimator = Self {
            trigger_pin: config.sonar.trigger_pin,
            poll_interval: config.sonar.poll_interval(),
            mount_offset_cm,
            filter: ScalarKalmanFilter::default(),
            has_estimate: false,
            hardware,
            distance: Published::new(mount_offset_cm),
            sweep_angle,
            bus,
            max_consecutive_failures: config.runtime.max_consecutive_io_failures,
            consecutive_failures: 0,
        };
        estimator.initialize(config.filter.q, config.filter.r)?;
        Ok(estimator)
    }

    /// Resets the filter to `Xk = 0`, `Pk = 0`, `Kk = 0` with new noise
    /// parameters and republishes the bare mount offset.
    pub fn initialize(&mut self, q: f64, r: f64) -> Result<(), ConfigError> {
        self.filter = ScalarKalmanFilter::new(q, r)?;
        self.has_estimate = false;
        self.publish(self.mount_offset_cm);
        Ok(())
    }

    /// A reader for the published filtered distance.
    pub fn distance_reader(&self) -> Published<f64> {
        self.distance.clone()
    }

    pub fn filtered_distance_cm(&self) -> f64 {
        self.distance.latest()
    }

    pub fn filter(&self) -> &ScalarKalmanFilter {
        &self.filter
    }

    /// Runs predict, correct and publish for one raw reading, in that order.
    pub fn on_sample(&mut self, raw: Option<f64>) -> f64 {
        let measurement = usable_sample(raw);
        let estimate = self.filter.step(measurement);
        self.has_estimate |= measurement.is_some();
        let filtered = estimate + self.mount_offset_cm;
        self.publish(filtered);
        filtered
    }

    fn publish(&self, filtered_distance_cm: f64) {
        self.distance.publish(filtered_distance_cm);
        self.bus.publish(ScanSnapshot {
            angle_deg: self.sweep_angle.latest(),
            filtered_distance_cm,
            has_estimate: self.has_estimate,
        });
    }

    /// Reads the sonar once. Transient failures count as "no measurement";
    /// `max_consecutive_failures` in a row is fatal.
    fn read(&mut self) -> Result<Option<f64>, RadarError> {
        match self.hardware.read_sonar_distance_cm(self.trigger_pin) {
            Ok(reading) => {
                self.consecutive_failures = 0;
                Ok(reading)
            }
            Err(source) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.max_consecutive_failures {
                    error!(
                        task = TASK,
                        failures = self.consecutive_failures,
                        "sonar keeps failing: {source}"
                    );
                    return Err(RadarError::PersistentIo {
                        task: TASK,
                        failures: self.consecutive_failures,
                        source,
                    });
                }
                warn!(
                    task = TASK,
                    failures = self.consecutive_failures,
                    "sonar read failed, skipping correction: {source}"
                );
                Ok(None)
            }
        }
    }

    /// The estimator loop. Returns when `stop` is raised (within one poll
    /// interval) or when the sonar fails persistently.
    pub fn run(mut self, stop: &StopSignal) -> Result<(), RadarError> {
        info!(
            task = TASK,
            poll_ms = self.poll_interval.as_millis() as u64,
            "range estimation started"
        );
        loop {
            let raw = self.read()?;
            self.on_sample(raw);

            if stop.wait(self.poll_interval) {
                info!(task = TASK, "range estimation stopped");
                return Ok(());
            }
        }
    }
}
