// radar_sim/src/board.rs

//! A stand-in for the microcontroller: servos that move instantly, a sonar
//! that ray-casts against round obstacles, and a laser pin whose state can be
//! read back by the display.

use nalgebra::{Point2, Vector2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use bevy::log::{debug, info};
use radar_core::config::RadarConfig;
use radar_core::error::IoError;
use radar_core::hardware::HardwareIo;

use crate::config::{Obstacle, SimulationConfig};
use crate::error::SimError;

/// What the laser is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaserState {
    pub angle_deg: Option<i32>,
    pub on: bool,
}

#[derive(Debug)]
struct BoardState {
    rng: ChaCha8Rng,
    servo_angles: HashMap<u8, i32>,
    outputs: HashMap<u8, bool>,
    configured: HashSet<u8>,
    shut_down: bool,
}

/// # SimulatedBoard
/// Implements `HardwareIo` over a static scene. The sonar sits
/// `mount_offset_cm` out from the sweep axis, so the reported range is the
/// hit distance minus that offset, as a real sensor would report it.
pub struct SimulatedBoard {
    sweep_servo_pin: u8,
    trigger_pin: u8,
    laser_servo_pin: u8,
    laser_output_pin: u8,
    beam_offset_deg: f64,
    mount_offset_cm: f64,
    obstacles: Vec<Obstacle>,
    max_echo_range_cm: f64,
    noise: Normal<f64>,
    miss_probability: f64,
    io_failure_probability: f64,
    io_latency: Duration,
    state: Mutex<BoardState>,
}

impl SimulatedBoard {
    pub fn new(radar: &RadarConfig, sim: &SimulationConfig) -> Result<Self, SimError> {
        sim.validate()?;
        let noise = Normal::new(0.0, sim.range_noise_stddev_cm).map_err(|e| SimError::Simulation {
            name: "range_noise_stddev_cm",
            reason: e.to_string(),
        })?;
        let rng = match sim.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        info!(
            obstacles = sim.obstacles.len(),
            seed = ?sim.seed,
            "[Board] simulated board ready on {}",
            radar.board.port
        );

        Ok(Self {
            sweep_servo_pin: radar.sweep.servo_pin,
            trigger_pin: radar.sonar.trigger_pin,
            laser_servo_pin: radar.laser.servo_pin,
            laser_output_pin: radar.laser.output_pin,
            beam_offset_deg: radar.sweep.offset_angle_deg,
            mount_offset_cm: radar.sonar.mount_offset_cm,
            obstacles: sim.obstacles.clone(),
            max_echo_range_cm: sim.max_echo_range_cm,
            noise,
            miss_probability: sim.miss_probability,
            io_failure_probability: sim.io_failure_probability,
            io_latency: Duration::from_millis(sim.io_latency_ms),
            state: Mutex::new(BoardState {
                rng,
                servo_angles: HashMap::new(),
                outputs: HashMap::new(),
                configured: HashSet::new(),
                shut_down: false,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fails with `error` at the configured rate, or if the board is closed.
    fn check_link(&self, state: &mut BoardState, error: IoError) -> Result<(), IoError> {
        if state.shut_down {
            return Err(IoError::Disconnected);
        }
        if self.io_failure_probability > 0.0 && state.rng.gen::<f64>() < self.io_failure_probability {
            return Err(error);
        }
        Ok(())
    }

    /// Distance from the sweep axis to the nearest obstacle along a beam at
    /// `beam_deg`, ignoring the echo limit.
    pub fn ray_hit_cm(&self, beam_deg: f64) -> Option<f64> {
        let (sin, cos) = beam_deg.to_radians().sin_cos();
        let direction = Vector2::new(cos, sin);
        self.obstacles
            .iter()
            .filter_map(|o| ray_circle_hit(&direction, &Point2::new(o.x_cm, o.y_cm), o.radius_cm))
            .min_by(f64::total_cmp)
    }

    /// The noiseless reading the sonar would report at `servo_angle_deg`.
    pub fn true_range_cm(&self, servo_angle_deg: i32) -> Option<f64> {
        self.ray_hit_cm(servo_angle_deg as f64 + self.beam_offset_deg)
            .filter(|hit| *hit <= self.max_echo_range_cm)
            .map(|hit| (hit - self.mount_offset_cm).max(0.0))
    }

    pub fn servo_angle(&self, pin: u8) -> Option<i32> {
        self.lock().servo_angles.get(&pin).copied()
    }

    pub fn laser_state(&self) -> LaserState {
        let state = self.lock();
        LaserState {
            angle_deg: state.servo_angles.get(&self.laser_servo_pin).copied(),
            on: state
                .outputs
                .get(&self.laser_output_pin)
                .copied()
                .unwrap_or(false),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }

    fn configure(&self, pins: &[u8]) -> Result<(), IoError> {
        let mut state = self.lock();
        if state.shut_down {
            return Err(IoError::Disconnected);
        }
        state.configured.extend(pins.iter().copied());
        Ok(())
    }
}

/// Nearest positive intersection of a ray from the origin along the unit
/// vector `direction` with a circle.
fn ray_circle_hit(direction: &Vector2<f64>, center: &Point2<f64>, radius: f64) -> Option<f64> {
    let along = direction.dot(&center.coords);
    let discriminant = along * along - (center.coords.norm_squared() - radius * radius);
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    [along - root, along + root]
        .into_iter()
        .find(|t| *t > 0.0)
}

impl HardwareIo for SimulatedBoard {
    fn set_servo_angle(&self, pin: u8, angle_deg: i32) -> Result<(), IoError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        self.check_link(
            state,
            IoError::Write {
                pin,
                reason: "servo write dropped".into(),
            },
        )?;
        state.servo_angles.insert(pin, angle_deg);
        Ok(())
    }

    fn read_sonar_distance_cm(&self, trigger_pin: u8) -> Result<Option<f64>, IoError> {
        if !self.io_latency.is_zero() {
            thread::sleep(self.io_latency);
        }

        let mut guard = self.lock();
        let state = &mut *guard;
        self.check_link(state, IoError::Timeout)?;
        if trigger_pin != self.trigger_pin {
            return Err(IoError::Read {
                pin: trigger_pin,
                reason: "no sonar on this pin".into(),
            });
        }

        let Some(angle) = state.servo_angles.get(&self.sweep_servo_pin).copied() else {
            return Ok(None);
        };
        if state.rng.gen::<f64>() < self.miss_probability {
            debug!("[Board] no echo at {angle} deg");
            return Ok(None);
        }
        let Some(range) = self.true_range_cm(angle) else {
            return Ok(None);
        };
        let noisy = range + self.noise.sample(&mut state.rng);
        Ok(Some(noisy.max(0.0)))
    }

    fn set_digital_output(&self, pin: u8, level: bool) -> Result<(), IoError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        self.check_link(
            state,
            IoError::Write {
                pin,
                reason: "output write dropped".into(),
            },
        )?;
        state.outputs.insert(pin, level);
        Ok(())
    }

    fn shutdown(&self) -> Result<(), IoError> {
        let mut state = self.lock();
        state.outputs.values_mut().for_each(|level| *level = false);
        state.shut_down = true;
        info!("[Board] board closed");
        Ok(())
    }

    fn configure_servo(&self, pin: u8) -> Result<(), IoError> {
        self.configure(&[pin])
    }

    fn configure_sonar(&self, trigger_pin: u8, echo_pin: u8) -> Result<(), IoError> {
        self.configure(&[trigger_pin, echo_pin])
    }

    fn configure_digital_output(&self, pin: u8) -> Result<(), IoError> {
        self.configure(&[pin])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn quiet_sim(obstacles: Vec<Obstacle>) -> SimulationConfig {
        SimulationConfig {
            seed: Some(1),
            range_noise_stddev_cm: 0.0,
            miss_probability: 0.0,
            io_failure_probability: 0.0,
            obstacles,
            ..SimulationConfig::default()
        }
    }

    fn post_ahead() -> Vec<Obstacle> {
        vec![Obstacle {
            x_cm: 0.0,
            y_cm: 20.0,
            radius_cm: 5.0,
        }]
    }

    #[test]
    fn sonar_reports_the_hit_minus_the_mount_offset() {
        let radar = RadarConfig::default();
        let board = SimulatedBoard::new(&radar, &quiet_sim(post_ahead())).unwrap();

        board.set_servo_angle(radar.sweep.servo_pin, 90).unwrap();
        let reading = board
            .read_sonar_distance_cm(radar.sonar.trigger_pin)
            .unwrap()
            .unwrap();
        assert_abs_diff_eq!(reading, 15.0 - 1.6, epsilon = 1e-9);

        board.set_servo_angle(radar.sweep.servo_pin, 0).unwrap();
        assert_eq!(board.read_sonar_distance_cm(radar.sonar.trigger_pin), Ok(None));
    }

    #[test]
    fn echoes_beyond_the_limit_are_lost() {
        let radar = RadarConfig::default();
        let sim = SimulationConfig {
            max_echo_range_cm: 10.0,
            ..quiet_sim(post_ahead())
        };
        let board = SimulatedBoard::new(&radar, &sim).unwrap();
        assert!(board.ray_hit_cm(90.0).is_some());
        assert!(board.true_range_cm(90).is_none());
    }

    #[test]
    fn ray_starting_inside_an_obstacle_hits_its_far_side() {
        let hit = ray_circle_hit(&Vector2::new(1.0, 0.0), &Point2::new(1.0, 0.0), 3.0);
        assert_abs_diff_eq!(hit.unwrap(), 4.0, epsilon = 1e-12);
        assert!(ray_circle_hit(&Vector2::new(-1.0, 0.0), &Point2::new(10.0, 0.0), 3.0).is_none());
    }

    #[test]
    fn same_seed_gives_the_same_readings() {
        let radar = RadarConfig::default();
        let sim = SimulationConfig {
            range_noise_stddev_cm: 0.5,
            ..quiet_sim(post_ahead())
        };
        let read_all = || {
            let board = SimulatedBoard::new(&radar, &sim).unwrap();
            board.set_servo_angle(radar.sweep.servo_pin, 90).unwrap();
            (0..10)
                .map(|_| board.read_sonar_distance_cm(radar.sonar.trigger_pin).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(read_all(), read_all());
    }

    #[test]
    fn laser_state_follows_its_pins() {
        let radar = RadarConfig::default();
        let board = SimulatedBoard::new(&radar, &quiet_sim(Vec::new())).unwrap();
        assert_eq!(board.laser_state(), LaserState::default());

        board.set_servo_angle(radar.laser.servo_pin, 80).unwrap();
        board.set_digital_output(radar.laser.output_pin, true).unwrap();
        assert_eq!(
            board.laser_state(),
            LaserState {
                angle_deg: Some(80),
                on: true
            }
        );

        board.shutdown().unwrap();
        assert!(!board.laser_state().on);
        assert!(board.is_shut_down());
        assert_eq!(
            board.set_servo_angle(radar.laser.servo_pin, 10),
            Err(IoError::Disconnected)
        );
    }

    #[test]
    fn certain_io_failure_fails_every_operation() {
        let radar = RadarConfig::default();
        let sim = SimulationConfig {
            io_failure_probability: 1.0,
            ..quiet_sim(post_ahead())
        };
        let board = SimulatedBoard::new(&radar, &sim).unwrap();
        assert!(matches!(
            board.set_servo_angle(2, 10),
            Err(IoError::Write { pin: 2, .. })
        ));
        assert_eq!(board.read_sonar_distance_cm(radar.sonar.trigger_pin), Err(IoError::Timeout));
        assert_eq!(board.servo_angle(2), None);
    }
}
