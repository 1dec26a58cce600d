// radar_core/src/locator.rs

use crossbeam_channel::{select, Receiver, Sender};
use nalgebra::Point2;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::RadarConfig;
use crate::error::RadarError;
use crate::geometry::{to_servo_command, LaserGeometry, TargetPoint};
use crate::hardware::HardwareIo;
use crate::task::StopSignal;

const TASK: &str = "laser";

/// A request for the laser, executed in submission order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaserCommand {
    Aim(TargetPoint),
    Off,
}

/// The result of one `Aim` command, reported back to whoever submitted it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocateOutcome {
    pub target: TargetPoint,
    /// The servo angle commanded, or why the laser stayed off.
    pub result: Result<i32, RadarError>,
}

/// Points the laser servo at a selected target and switches the laser on.
/// Owns the laser servo and laser output pins.
pub struct TargetLocator {
    servo_pin: u8,
    output_pin: u8,
    geometry: LaserGeometry,
    min_angle: i32,
    max_angle: i32,
    settle: Duration,
    hardware: Arc<dyn HardwareIo>,
}

impl TargetLocator {
    pub fn new(config: &RadarConfig, hardware: Arc<dyn HardwareIo>) -> Self {
        let laser = &config.laser;
        Self {
            servo_pin: laser.servo_pin,
            output_pin: laser.output_pin,
            geometry: LaserGeometry {
                laser_position: Point2::new(laser.mount_x_cm, laser.mount_y_cm),
                sonar_offset_rad: config.sweep.offset_angle_deg.to_radians(),
                laser_offset_deg: laser.offset_angle_deg,
            },
            min_angle: laser.min_angle,
            max_angle: laser.max_angle,
            settle: Duration::from_millis(laser.settle_ms),
            hardware,
        }
    }

    /// Laser off, compute, rotate, wait for the servo, laser on. On any
    /// failure the laser is left off.
    pub fn locate(&self, target: TargetPoint) -> Result<i32, RadarError> {
        self.laser_off()?;

        let raw_angle = self.geometry.servo_angle_deg(target)?;
        let command = to_servo_command(raw_angle, self.min_angle, self.max_angle);
        if command as f64 != raw_angle.trunc() {
            warn!(task = TASK, raw_angle, command, "laser angle clamped to servo range");
        }

        self.hardware.set_servo_angle(self.servo_pin, command)?;
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        self.hardware.set_digital_output(self.output_pin, true)?;
        Ok(command)
    }

    /// Idempotent.
    pub fn laser_off(&self) -> Result<(), RadarError> {
        self.hardware.set_digital_output(self.output_pin, false)?;
        Ok(())
    }

    pub fn execute(&self, command: LaserCommand) -> Option<LocateOutcome> {
        match command {
            LaserCommand::Aim(target) => {
                let result = self.locate(target);
                match &result {
                    Ok(angle) => info!(
                        task = TASK,
                        x = target.x,
                        y = target.y,
                        angle,
                        "laser on target"
                    ),
                    Err(e) => warn!(task = TASK, x = target.x, y = target.y, "laser stays off: {e}"),
                }
                Some(LocateOutcome { target, result })
            }
            LaserCommand::Off => {
                if let Err(e) = self.laser_off() {
                    warn!(task = TASK, "laser off failed: {e}");
                }
                None
            }
        }
    }

    /// Serves laser commands one at a time until `stop` is raised or every
    /// command sender is gone, then turns the laser off.
    pub fn run(
        self,
        commands: Receiver<LaserCommand>,
        outcomes: Sender<LocateOutcome>,
        stop: &StopSignal,
    ) -> Result<(), RadarError> {
        info!(task = TASK, "laser worker started");
        loop {
            select! {
                recv(commands) -> command => match command {
                    Ok(command) => {
                        if let Some(outcome) = self.execute(command) {
                            let _ = outcomes.send(outcome);
                        }
                    }
                    Err(_) => break,
                },
                recv(stop.receiver()) -> _ => break,
            }
        }
        self.laser_off()?;
        info!(task = TASK, "laser worker stopped, laser off");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use crate::hardware::{HardwareCommand, RecordingHardware};
    use crate::task::TaskHandle;
    use crossbeam_channel::unbounded;

    fn bench_config() -> RadarConfig {
        let mut config = RadarConfig::default();
        config.laser.settle_ms = 0;
        config
    }

    #[test]
    fn locate_turns_laser_off_rotates_then_on() {
        let config = bench_config();
        let hw = Arc::new(RecordingHardware::new());
        let locator = TargetLocator::new(&config, hw.clone());

        assert_eq!(locator.locate(TargetPoint::new(7.5, 10.0)), Ok(80));
        assert_eq!(
            hw.commands(),
            vec![
                HardwareCommand::DigitalOutput { pin: 8, level: false },
                HardwareCommand::ServoAngle { pin: 6, angle_deg: 80 },
                HardwareCommand::DigitalOutput { pin: 8, level: true },
            ]
        );
    }

    #[test]
    fn degenerate_target_leaves_laser_off() {
        let config = bench_config();
        let hw = Arc::new(RecordingHardware::new());
        let locator = TargetLocator::new(&config, hw.clone());

        assert_eq!(
            locator.locate(TargetPoint::new(7.5, 0.0)),
            Err(RadarError::Geometry(GeometryError::TargetAtLaser))
        );
        assert_eq!(hw.digital_levels(8), vec![false]);
        assert!(hw.servo_angles(6).is_empty());
    }

    #[test]
    fn angle_is_clamped_to_the_servo_range() {
        let mut config = bench_config();
        config.laser.offset_angle_deg = 170.0;
        let hw = Arc::new(RecordingHardware::new());
        let locator = TargetLocator::new(&config, hw.clone());

        // 90 deg - 170 deg lands below the servo's travel.
        assert_eq!(locator.locate(TargetPoint::new(7.5, 10.0)), Ok(0));
        assert_eq!(hw.servo_angles(6), vec![0]);
    }

    #[test]
    fn laser_off_is_idempotent() {
        let hw = Arc::new(RecordingHardware::new());
        let locator = TargetLocator::new(&bench_config(), hw.clone());
        locator.laser_off().unwrap();
        locator.laser_off().unwrap();
        assert_eq!(hw.digital_levels(8), vec![false, false]);
    }

    #[test]
    fn worker_runs_commands_in_order_and_reports_outcomes() {
        let hw = Arc::new(RecordingHardware::new());
        let locator = TargetLocator::new(&bench_config(), hw.clone());
        let (command_tx, command_rx) = unbounded();
        let (outcome_tx, outcome_rx) = unbounded();

        command_tx.send(LaserCommand::Aim(TargetPoint::new(7.5, 10.0))).unwrap();
        command_tx.send(LaserCommand::Aim(TargetPoint::new(7.5, 0.0))).unwrap();
        command_tx.send(LaserCommand::Off).unwrap();
        drop(command_tx);

        let task = TaskHandle::spawn(TASK, move |stop| locator.run(command_rx, outcome_tx, &stop))
            .unwrap();
        let result = task
            .join_until(std::time::Instant::now() + Duration::from_secs(2))
            .unwrap();
        assert_eq!(result, Ok(()));

        let outcomes: Vec<LocateOutcome> = outcome_rx.try_iter().collect();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].result, Ok(80));
        assert!(outcomes[1].result.is_err());

        // first aim (off, on), degenerate aim (off), explicit off, worker exit
        assert_eq!(hw.digital_levels(8), vec![false, true, false, false, false]);
    }
}
