// radar_core/src/sweep.rs

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::RadarConfig;
use crate::error::{ConfigError, IoError, RadarError};
use crate::hardware::HardwareIo;
use crate::snapshot::Published;
use crate::task::StopSignal;

const TASK: &str = "sweep";

// =========================================================================
// == Sweep State Machine ==
// =========================================================================

/// Where the scanning servo is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    SweepingUp(i32),
    SweepingDown(i32),
    ReturningToRest(i32),
}

impl SweepState {
    pub fn angle(&self) -> i32 {
        match *self {
            SweepState::SweepingUp(a)
            | SweepState::SweepingDown(a)
            | SweepState::ReturningToRest(a) => a,
        }
    }

    /// The next one-degree step. While sweeping, the direction flips on
    /// reaching a bound, so each bound is visited once per turn. While
    /// returning, the angle moves toward the rest angle and stays there.
    pub fn next(self, min_angle: i32, max_angle: i32) -> Self {
        match self {
            SweepState::SweepingUp(a) if a + 1 >= max_angle => SweepState::SweepingDown(max_angle),
            SweepState::SweepingUp(a) => SweepState::SweepingUp(a + 1),
            SweepState::SweepingDown(a) if a - 1 <= min_angle => SweepState::SweepingUp(min_angle),
            SweepState::SweepingDown(a) => SweepState::SweepingDown(a - 1),
            SweepState::ReturningToRest(a) => {
                let rest = rest_angle(min_angle, max_angle);
                SweepState::ReturningToRest(a - (a - rest).signum())
            }
        }
    }

    /// The state entered on a stop request.
    pub fn stop(self) -> Self {
        SweepState::ReturningToRest(self.angle())
    }

    pub fn is_at_rest(&self, min_angle: i32, max_angle: i32) -> bool {
        matches!(*self, SweepState::ReturningToRest(a) if a == rest_angle(min_angle, max_angle))
    }
}

/// Where the servo parks: zero, kept inside the sweep bounds.
pub fn rest_angle(min_angle: i32, max_angle: i32) -> i32 {
    0.clamp(min_angle, max_angle)
}

/// The endless angle sequence driven by the sweep:
/// `min..max` ascending, then `max..min` descending, repeating.
#[derive(Debug, Clone)]
pub struct SweepPattern {
    state: SweepState,
    min_angle: i32,
    max_angle: i32,
}

impl SweepPattern {
    pub fn new(min_angle: i32, max_angle: i32) -> Self {
        Self {
            state: SweepState::SweepingUp(min_angle),
            min_angle,
            max_angle,
        }
    }
}

impl Iterator for SweepPattern {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        let angle = self.state.angle();
        self.state = self.state.next(self.min_angle, self.max_angle);
        Some(angle)
    }
}

// =========================================================================
// == Sweep Controller ==
// =========================================================================

/// Drives the scanning servo back and forth and publishes the current angle.
pub struct SweepController {
    servo_pin: u8,
    min_angle: i32,
    max_angle: i32,
    step_time: Duration,
    hardware: Arc<dyn HardwareIo>,
    angle: Published<i32>,
    max_consecutive_failures: u32,
    consecutive_failures: u32,
}

impl SweepController {
    pub fn new(config: &RadarConfig, hardware: Arc<dyn HardwareIo>) -> Result<Self, ConfigError> {
        let sweep = &config.sweep;
        if sweep.min_angle >= sweep.max_angle {
            return Err(ConfigError::InvalidSweepBounds {
                min: sweep.min_angle,
                max: sweep.max_angle,
            });
        }
        Ok(Self {
            servo_pin: sweep.servo_pin,
            min_angle: sweep.min_angle,
            max_angle: sweep.max_angle,
            step_time: sweep.step_time(),
            hardware,
            angle: Published::new(sweep.min_angle),
            max_consecutive_failures: config.runtime.max_consecutive_io_failures,
            consecutive_failures: 0,
        })
    }

    pub fn step_time(&self) -> Duration {
        self.step_time
    }

    /// A reader for the published angle.
    pub fn angle_reader(&self) -> Published<i32> {
        self.angle.clone()
    }

    pub fn angle(&self) -> i32 {
        self.angle.latest()
    }

    /// Commands the servo, then publishes. A failed write still advances the
    /// logical angle; too many in a row are fatal.
    fn move_to(&mut self, angle: i32) -> Result<(), RadarError> {
        let outcome = self.hardware.set_servo_angle(self.servo_pin, angle);
        self.angle.publish(angle);
        match outcome {
            Ok(()) => {
                self.consecutive_failures = 0;
                Ok(())
            }
            Err(source) => self.record_failure(angle, source),
        }
    }

    fn record_failure(&mut self, angle: i32, source: IoError) -> Result<(), RadarError> {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.max_consecutive_failures {
            error!(
                task = TASK,
                failures = self.consecutive_failures,
                "servo keeps failing, stopping the sweep: {source}"
            );
            return Err(RadarError::PersistentIo {
                task: TASK,
                failures: self.consecutive_failures,
                source,
            });
        }
        warn!(
            task = TASK,
            angle,
            failures = self.consecutive_failures,
            "servo write failed, skipping step: {source}"
        );
        Ok(())
    }

    /// The sweep loop. Checks `stop` once per step; on stop the servo walks
    /// back to rest at the same pace and the loop ends.
    pub fn run(mut self, stop: &StopSignal) -> Result<(), RadarError> {
        info!(
            task = TASK,
            min = self.min_angle,
            max = self.max_angle,
            step_ms = self.step_time.as_secs_f64() * 1e3,
            "sweep started"
        );
        let mut state = SweepState::SweepingUp(self.min_angle);
        loop {
            let angle = state.angle();
            self.move_to(angle)?;

            if stop.wait(self.step_time) {
                return self.return_to_rest(state.stop());
            }
            state = state.next(self.min_angle, self.max_angle);
        }
    }

    /// Walks one degree per step to the rest angle, the rest angle included.
    /// The starting angle is already commanded.
    fn return_to_rest(&mut self, mut state: SweepState) -> Result<(), RadarError> {
        let (min, max) = (self.min_angle, self.max_angle);
        info!(
            task = TASK,
            from = state.angle(),
            rest = rest_angle(min, max),
            "returning to rest"
        );
        while !state.is_at_rest(min, max) {
            state = state.next(min, max);
            self.move_to(state.angle())?;
            if !state.is_at_rest(min, max) {
                thread::sleep(self.step_time);
            }
        }
        info!(task = TASK, "sweep stopped at rest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::RecordingHardware;
    use crate::task::TaskHandle;
    use std::time::Instant;

    fn config(min: i32, max: i32, half_cycle_secs: f64) -> RadarConfig {
        let mut config = RadarConfig::default();
        config.sweep.min_angle = min;
        config.sweep.max_angle = max;
        config.sweep.half_cycle_secs = half_cycle_secs;
        config
    }

    #[test]
    fn pattern_rises_then_falls_between_bounds() {
        let angles: Vec<i32> = SweepPattern::new(0, 180).take(361).collect();

        assert!(angles[..181].windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(angles[0], 0);
        assert_eq!(angles[180], 180);
        assert!(angles[180..].windows(2).all(|w| w[1] == w[0] - 1));
        assert_eq!(angles[360], 0);

        // And repeats.
        let second: Vec<i32> = SweepPattern::new(0, 180).skip(360).take(361).collect();
        assert_eq!(second, angles);
    }

    #[test]
    fn pattern_never_leaves_the_bounds() {
        assert!(SweepPattern::new(30, 60)
            .take(500)
            .all(|a| (30..=60).contains(&a)));
        let tight: Vec<i32> = SweepPattern::new(10, 11).take(4).collect();
        assert_eq!(tight, vec![10, 11, 10, 11]);
    }

    fn walk_to_rest(from: SweepState, min: i32, max: i32) -> Vec<i32> {
        let mut state = from.stop();
        let mut angles = vec![state.angle()];
        while !state.is_at_rest(min, max) {
            state = state.next(min, max);
            angles.push(state.angle());
        }
        angles
    }

    #[test]
    fn returning_to_rest_ends_on_the_rest_angle() {
        assert_eq!(walk_to_rest(SweepState::SweepingUp(3), 0, 180), vec![3, 2, 1, 0]);
        assert_eq!(walk_to_rest(SweepState::SweepingDown(0), 0, 180), vec![0]);
        // Zero outside the bounds parks on the nearest bound.
        assert_eq!(walk_to_rest(SweepState::SweepingUp(32), 30, 60), vec![32, 31, 30]);

        let parked = SweepState::ReturningToRest(0);
        assert_eq!(parked.next(0, 180), parked);
        assert!(parked.is_at_rest(0, 180));
        assert!(!SweepState::SweepingUp(0).is_at_rest(0, 180));
    }

    #[test]
    fn step_time_matches_half_cycle() {
        let hw = Arc::new(RecordingHardware::new());
        let controller = SweepController::new(&config(0, 180, 4.0), hw).unwrap();
        let expected = Duration::from_secs_f64(4.0 / 180.0);
        assert_eq!(controller.step_time(), expected);
    }

    #[test]
    fn equal_bounds_are_a_configuration_error() {
        let hw = Arc::new(RecordingHardware::new());
        assert!(matches!(
            SweepController::new(&config(90, 90, 4.0), hw),
            Err(ConfigError::InvalidSweepBounds { .. })
        ));
    }

    #[test]
    fn stop_walks_back_to_rest_and_ends() {
        let hw = Arc::new(RecordingHardware::new());
        // 5 ms per degree.
        let controller = SweepController::new(&config(0, 20, 0.1), hw.clone()).unwrap();
        let step = controller.step_time();
        let reader = controller.angle_reader();
        let pin = RadarConfig::default().sweep.servo_pin;

        let task = TaskHandle::spawn(TASK, move |stop| controller.run(&stop)).unwrap();
        while hw.servo_angles(pin).len() < 8 {
            thread::sleep(Duration::from_millis(1));
        }
        let result = task.stop_and_join(Duration::from_secs(2)).unwrap();
        assert_eq!(result, Ok(()));

        let timed = hw.timed_servo_angles(pin);
        let angles: Vec<i32> = timed.iter().map(|(_, a)| *a).collect();
        assert_eq!(*angles.last().unwrap(), 0);
        assert_eq!(reader.latest(), 0);

        // The tail is a one-degree-per-step descent from the peak to zero.
        let peak = angles.iter().copied().max().unwrap();
        let peak_at = angles.iter().position(|a| *a == peak).unwrap();
        let tail = &angles[peak_at..];
        let expected: Vec<i32> = (0..=peak).rev().collect();
        assert_eq!(tail, expected.as_slice());

        // Descent steps are paced by the step time, with generous headroom.
        for pair in timed[peak_at..].windows(2) {
            let gap = pair[1].0.duration_since(pair[0].0);
            assert!(gap < step * 20, "descent step took {gap:?}");
        }

        // Nothing is written once the task has ended.
        let written = hw.servo_angles(pin).len();
        thread::sleep(step * 4);
        assert_eq!(hw.servo_angles(pin).len(), written);
    }

    #[test]
    fn stop_latency_is_about_one_step() {
        let hw = Arc::new(RecordingHardware::new());
        // A long step: 100 ms per degree.
        let controller = SweepController::new(&config(0, 10, 1.0), hw.clone()).unwrap();
        let pin = RadarConfig::default().sweep.servo_pin;

        let mut task = TaskHandle::spawn(TASK, move |stop| controller.run(&stop)).unwrap();
        while hw.servo_angles(pin).is_empty() {
            thread::sleep(Duration::from_millis(1));
        }
        let asked = Instant::now();
        task.request_stop();
        // At angle 0 there is nothing to walk back.
        let result = task.join_until(asked + Duration::from_secs(2)).unwrap();
        assert_eq!(result, Ok(()));
        assert!(asked.elapsed() < Duration::from_millis(90));
    }

    #[test]
    fn transient_write_failures_do_not_stall_the_sweep() {
        let hw = Arc::new(RecordingHardware::new());
        let pin = RadarConfig::default().sweep.servo_pin;
        hw.fail_servo_writes(pin, 2);
        let controller = SweepController::new(&config(0, 20, 0.1), hw.clone()).unwrap();
        let reader = controller.angle_reader();

        let task = TaskHandle::spawn(TASK, move |stop| controller.run(&stop)).unwrap();
        while hw.servo_angles(pin).len() < 5 {
            thread::sleep(Duration::from_millis(1));
        }
        let result = task.stop_and_join(Duration::from_secs(2)).unwrap();

        assert_eq!(result, Ok(()));
        assert_eq!(hw.failed_writes(), 2);
        // Angles 0 and 1 were skipped, the sweep carried on from 2.
        assert_eq!(hw.servo_angles(pin)[0], 2);
        assert_eq!(reader.latest(), 0);
    }

    #[test]
    fn three_consecutive_failures_are_fatal() {
        let hw = Arc::new(RecordingHardware::new());
        let pin = RadarConfig::default().sweep.servo_pin;
        hw.fail_servo_writes(pin, 3);
        let controller = SweepController::new(&config(0, 20, 0.1), hw.clone()).unwrap();

        let task = TaskHandle::spawn(TASK, move |stop| controller.run(&stop)).unwrap();
        let result = task
            .join_until(Instant::now() + Duration::from_secs(2))
            .unwrap();

        assert!(matches!(
            result,
            Err(RadarError::PersistentIo { task: TASK, failures: 3, .. })
        ));
        assert!(hw.servo_angles(pin).is_empty());
    }
}
