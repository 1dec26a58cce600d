// radar_core/src/runtime.rs

//! The supervisor that wires the sweep, the range estimator and the laser
//! worker to one hardware driver, and the cloneable handle the display uses.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::RadarConfig;
use crate::error::RadarError;
use crate::estimation::RangeEstimator;
use crate::geometry::TargetPoint;
use crate::hardware::HardwareIo;
use crate::locator::{LaserCommand, LocateOutcome, TargetLocator};
use crate::snapshot::{Published, ScanSnapshot, ScanSnapshotBus};
use crate::sweep::SweepController;
use crate::task::{StopSignal, TaskHandle};

type TaskResult = Result<(), RadarError>;

// =========================================================================
// == Display-Facing Handle ==
// =========================================================================

/// Everything the display needs: non-blocking reads of the latest values and
/// the click-driven laser entry points.
#[derive(Clone)]
pub struct RadarHandle {
    sweep_angle: Published<i32>,
    filtered_distance: Published<f64>,
    bus: ScanSnapshotBus,
    laser_commands: Sender<LaserCommand>,
    locate_outcomes: Receiver<LocateOutcome>,
    fatal: Receiver<RadarError>,
}

impl RadarHandle {
    pub fn sweep_angle_deg(&self) -> i32 {
        self.sweep_angle.latest()
    }

    pub fn filtered_distance_cm(&self) -> f64 {
        self.filtered_distance.latest()
    }

    /// The latest {angle, distance} pair published by the estimator.
    pub fn snapshot(&self) -> ScanSnapshot {
        self.bus.latest()
    }

    /// Queues a laser aim at `(x, y)` in sensor-frame centimetres.
    pub fn submit_target(&self, x: f64, y: f64) {
        self.send_laser(LaserCommand::Aim(TargetPoint::new(x, y)));
    }

    /// Queues a laser-off. It runs after any aim submitted before it.
    pub fn clear_target(&self) {
        self.send_laser(LaserCommand::Off);
    }

    /// Drains the outcomes of completed aims without blocking.
    pub fn locate_outcomes(&self) -> Vec<LocateOutcome> {
        self.locate_outcomes.try_iter().collect()
    }

    /// A fatal task error, if one has been raised since the last call.
    pub fn take_fatal(&self) -> Option<RadarError> {
        self.fatal.try_recv().ok()
    }

    fn send_laser(&self, command: LaserCommand) {
        if self.laser_commands.send(command).is_err() {
            warn!("laser worker is gone, dropping {command:?}");
        }
    }
}

// =========================================================================
// == Runtime Supervisor ==
// =========================================================================

/// Owns the three long-lived tasks and the hardware driver.
pub struct RadarRuntime {
    config: RadarConfig,
    hardware: Arc<dyn HardwareIo>,
    handle: RadarHandle,
    tasks: Vec<TaskHandle<TaskResult>>,
}

impl RadarRuntime {
    /// Validates the configuration, sets the pin modes and starts the sweep,
    /// the estimator and the laser worker. A configuration error is returned
    /// before the hardware is touched.
    pub fn start(config: RadarConfig, hardware: Arc<dyn HardwareIo>) -> Result<Self, RadarError> {
        config.validate()?;
        let sweep = SweepController::new(&config, Arc::clone(&hardware))?;
        let bus = ScanSnapshotBus::new();
        let estimator = RangeEstimator::new(
            &config,
            Arc::clone(&hardware),
            sweep.angle_reader(),
            bus.clone(),
        )?;
        let locator = TargetLocator::new(&config, Arc::clone(&hardware));

        info!(
            port = %config.board.port,
            min_angle = config.sweep.min_angle,
            max_angle = config.sweep.max_angle,
            step_ms = sweep.step_time().as_secs_f64() * 1e3,
            q = config.filter.q,
            r = config.filter.r,
            "starting radar"
        );

        let (fatal_tx, fatal_rx) = unbounded();
        let (command_tx, command_rx) = unbounded();
        let (outcome_tx, outcome_rx) = unbounded();

        let handle = RadarHandle {
            sweep_angle: sweep.angle_reader(),
            filtered_distance: estimator.distance_reader(),
            bus,
            laser_commands: command_tx,
            locate_outcomes: outcome_rx,
            fatal: fatal_rx,
        };

        let mut runtime = Self {
            config,
            hardware,
            handle,
            tasks: Vec::with_capacity(3),
        };

        let started = runtime.bring_up(sweep, estimator, locator, fatal_tx, command_rx, outcome_tx);
        if let Err(e) = started {
            // The pins may already be configured and some tasks running.
            error!("radar failed to start: {e}");
            if let Err(release) = runtime.shutdown() {
                warn!("releasing the hardware after a failed start: {release}");
            }
            return Err(e);
        }
        Ok(runtime)
    }

    /// Configures the pins, then spawns the sweep, the estimator and the
    /// laser worker, in that order.
    fn bring_up(
        &mut self,
        sweep: SweepController,
        estimator: RangeEstimator,
        locator: TargetLocator,
        fatal: Sender<RadarError>,
        commands: Receiver<LaserCommand>,
        outcomes: Sender<LocateOutcome>,
    ) -> Result<(), RadarError> {
        Self::configure_pins(&self.config, self.hardware.as_ref())?;
        self.spawn_supervised("sweep", fatal.clone(), move |stop| sweep.run(&stop))?;
        self.spawn_supervised("range-estimator", fatal.clone(), move |stop| {
            estimator.run(&stop)
        })?;
        self.spawn_supervised("laser", fatal, move |stop| {
            locator.run(commands, outcomes, &stop)
        })
    }

    fn configure_pins(config: &RadarConfig, hardware: &dyn HardwareIo) -> Result<(), RadarError> {
        hardware.configure_servo(config.sweep.servo_pin)?;
        hardware.configure_sonar(config.sonar.trigger_pin, config.sonar.echo_pin)?;
        hardware.configure_servo(config.laser.servo_pin)?;
        hardware.configure_digital_output(config.laser.output_pin)?;
        Ok(())
    }

    /// Spawns a task whose error, if any, is also forwarded to the fatal channel.
    fn spawn_supervised<F>(
        &mut self,
        name: &'static str,
        fatal: Sender<RadarError>,
        work: F,
    ) -> Result<(), RadarError>
    where
        F: FnOnce(StopSignal) -> TaskResult + Send + 'static,
    {
        let task = TaskHandle::spawn(name, move |stop| {
            let result = work(stop);
            if let Err(e) = &result {
                error!(task = name, "task failed: {e}");
                let _ = fatal.send(e.clone());
            }
            result
        })?;
        self.tasks.push(task);
        Ok(())
    }

    pub fn handle(&self) -> RadarHandle {
        self.handle.clone()
    }

    /// Stops every task, joins them against one shared deadline, turns the
    /// laser off and shuts the hardware down. Returns the first error seen;
    /// the hardware is shut down regardless.
    pub fn shutdown(mut self) -> Result<(), RadarError> {
        let grace = self.config.runtime.shutdown_grace();
        info!(grace_ms = grace.as_millis() as u64, "shutting down radar");

        for task in &mut self.tasks {
            task.request_stop();
        }
        let deadline = Instant::now() + grace;

        let mut first_error = None;
        for task in self.tasks.drain(..) {
            let name = task.name();
            let outcome = task.join_until(deadline).and_then(|result| result);
            match outcome {
                Ok(()) => info!(task = name, "stopped"),
                Err(e) => {
                    warn!(task = name, "stopped with error: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Err(e) = self
            .hardware
            .set_digital_output(self.config.laser.output_pin, false)
        {
            warn!("could not switch the laser off: {e}");
        }
        if let Err(e) = self.hardware.shutdown() {
            warn!("hardware shutdown failed: {e}");
            first_error.get_or_insert(e.into());
        }
        info!("radar shut down");

        first_error.map_or(Ok(()), Err)
    }
}
