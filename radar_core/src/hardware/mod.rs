// radar_core/src/hardware/mod.rs

//! The boundary to the microcontroller. Everything that turns an angle or a
//! logic level into an electrical signal lives behind `HardwareIo`.

use crate::error::IoError;

// --- HARDWARE BOUNDARY TRAIT ---
/// A fallible, possibly slow device driver. A single instance is shared by all
/// tasks through an `Arc`, so implementations synchronise internally.
///
/// Pin ownership is enforced by configuration, not by the driver: each pin is
/// written by exactly one task.
pub trait HardwareIo: Send + Sync {
    /// Commands a servo to `angle_deg`.
    fn set_servo_angle(&self, pin: u8, angle_deg: i32) -> Result<(), IoError>;

    /// Triggers the sonar and returns the echo distance in centimetres.
    /// `Ok(None)` means no echo arrived within the driver's own timeout.
    fn read_sonar_distance_cm(&self, trigger_pin: u8) -> Result<Option<f64>, IoError>;

    /// Drives a digital output pin high or low.
    fn set_digital_output(&self, pin: u8, level: bool) -> Result<(), IoError>;

    /// Releases the device. Called once, after every task has stopped.
    fn shutdown(&self) -> Result<(), IoError>;

    /// Puts `pin` into servo mode.
    fn configure_servo(&self, pin: u8) -> Result<(), IoError> {
        let _ = pin;
        Ok(())
    }

    /// Puts the trigger/echo pair into sonar mode.
    fn configure_sonar(&self, trigger_pin: u8, echo_pin: u8) -> Result<(), IoError> {
        let _ = (trigger_pin, echo_pin);
        Ok(())
    }

    /// Puts `pin` into digital output mode.
    fn configure_digital_output(&self, pin: u8) -> Result<(), IoError> {
        let _ = pin;
        Ok(())
    }
}

mod recording;

pub use recording::{HardwareCommand, RecordingHardware};
