// radar_core/src/hardware/recording.rs

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::HardwareIo;
use crate::error::IoError;

/// One successful call made against a `RecordingHardware`.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareCommand {
    ConfigureServo { pin: u8 },
    ConfigureSonar { trigger_pin: u8, echo_pin: u8 },
    ConfigureOutput { pin: u8 },
    ServoAngle { pin: u8, angle_deg: i32 },
    DigitalOutput { pin: u8, level: bool },
    Shutdown,
}

#[derive(Default)]
struct Recorder {
    log: Vec<(Instant, HardwareCommand)>,
    sonar_script: VecDeque<Result<Option<f64>, IoError>>,
    idle_reading: Option<f64>,
    sonar_reads: usize,
    pending_servo_faults: HashMap<u8, u32>,
    failing_setup: HashSet<u8>,
    failed_writes: usize,
}

/// A scripted stand-in for the board: sonar readings are played back from a
/// queue, write faults can be injected per pin, and every successful command
/// is recorded with the instant it happened.
#[derive(Default)]
pub struct RecordingHardware {
    state: Mutex<Recorder>,
}

impl RecordingHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues sonar results, returned one per read in order.
    pub fn with_sonar_script<I>(self, readings: I) -> Self
    where
        I: IntoIterator<Item = Result<Option<f64>, IoError>>,
    {
        self.lock().sonar_script.extend(readings);
        self
    }

    /// The reading returned once the script is exhausted (default: no echo).
    pub fn with_idle_reading(self, reading: Option<f64>) -> Self {
        self.lock().idle_reading = reading;
        self
    }

    /// Makes the next `count` servo writes to `pin` fail.
    pub fn fail_servo_writes(&self, pin: u8, count: u32) {
        *self.lock().pending_servo_faults.entry(pin).or_default() += count;
    }

    /// Makes every pin-mode call that touches `pin` fail.
    pub fn fail_pin_setup(&self, pin: u8) {
        self.lock().failing_setup.insert(pin);
    }

    pub fn commands(&self) -> Vec<HardwareCommand> {
        self.lock().log.iter().map(|(_, cmd)| cmd.clone()).collect()
    }

    /// Successful servo writes to `pin`, in order.
    pub fn servo_angles(&self, pin: u8) -> Vec<i32> {
        self.timed_servo_angles(pin)
            .into_iter()
            .map(|(_, angle)| angle)
            .collect()
    }

    pub fn timed_servo_angles(&self, pin: u8) -> Vec<(Instant, i32)> {
        self.lock()
            .log
            .iter()
            .filter_map(|(at, cmd)| match cmd {
                HardwareCommand::ServoAngle { pin: p, angle_deg } if *p == pin => {
                    Some((*at, *angle_deg))
                }
                _ => None,
            })
            .collect()
    }

    pub fn digital_levels(&self, pin: u8) -> Vec<bool> {
        self.lock()
            .log
            .iter()
            .filter_map(|(_, cmd)| match cmd {
                HardwareCommand::DigitalOutput { pin: p, level } if *p == pin => Some(*level),
                _ => None,
            })
            .collect()
    }

    pub fn sonar_reads(&self) -> usize {
        self.lock().sonar_reads
    }

    pub fn failed_writes(&self) -> usize {
        self.lock().failed_writes
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock()
            .log
            .iter()
            .any(|(_, cmd)| *cmd == HardwareCommand::Shutdown)
    }

    fn lock(&self) -> MutexGuard<'_, Recorder> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, command: HardwareCommand) {
        self.lock().log.push((Instant::now(), command));
    }

    fn record_setup(&self, pins: &[u8], command: HardwareCommand) -> Result<(), IoError> {
        let mut state = self.lock();
        if let Some(pin) = pins.iter().find(|p| state.failing_setup.contains(p)) {
            return Err(IoError::Write {
                pin: *pin,
                reason: "injected setup fault".to_string(),
            });
        }
        state.log.push((Instant::now(), command));
        Ok(())
    }
}

impl HardwareIo for RecordingHardware {
    fn set_servo_angle(&self, pin: u8, angle_deg: i32) -> Result<(), IoError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if let Some(remaining) = state.pending_servo_faults.get_mut(&pin) {
            if *remaining > 0 {
                *remaining -= 1;
                state.failed_writes += 1;
                return Err(IoError::Write {
                    pin,
                    reason: "injected fault".to_string(),
                });
            }
        }
        state
            .log
            .push((Instant::now(), HardwareCommand::ServoAngle { pin, angle_deg }));
        Ok(())
    }

    fn read_sonar_distance_cm(&self, _trigger_pin: u8) -> Result<Option<f64>, IoError> {
        let mut state = self.lock();
        state.sonar_reads += 1;
        let idle = state.idle_reading;
        state.sonar_script.pop_front().unwrap_or(Ok(idle))
    }

    fn set_digital_output(&self, pin: u8, level: bool) -> Result<(), IoError> {
        self.record(HardwareCommand::DigitalOutput { pin, level });
        Ok(())
    }

    fn shutdown(&self) -> Result<(), IoError> {
        self.record(HardwareCommand::Shutdown);
        Ok(())
    }

    fn configure_servo(&self, pin: u8) -> Result<(), IoError> {
        self.record_setup(&[pin], HardwareCommand::ConfigureServo { pin })
    }

    fn configure_sonar(&self, trigger_pin: u8, echo_pin: u8) -> Result<(), IoError> {
        self.record_setup(
            &[trigger_pin, echo_pin],
            HardwareCommand::ConfigureSonar {
                trigger_pin,
                echo_pin,
            },
        )
    }

    fn configure_digital_output(&self, pin: u8) -> Result<(), IoError> {
        self.record_setup(&[pin], HardwareCommand::ConfigureOutput { pin })
    }
}
