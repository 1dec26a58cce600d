// radar_core/src/task.rs

//! Long-lived worker threads with structured cancellation.
//!
//! Cancellation is a channel-close signal: the owner holds the only `Sender`,
//! and dropping it wakes every waiter immediately. Workers wait on the signal
//! with a timeout, so their fixed-interval sleep doubles as the cancellation
//! check point.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::RadarError;

/// The worker-side view of a stop request.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: Receiver<()>,
}

impl StopSignal {
    /// Sleeps for up to `timeout`. Returns `true` as soon as a stop is
    /// requested, `false` if the full interval elapsed.
    pub fn wait(&self, timeout: Duration) -> bool {
        !matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }

    /// The underlying receiver, for use in `select!` next to other channels.
    /// It becomes ready (disconnected) once a stop is requested.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

/// The owner-side half. Dropping it also requests a stop.
#[derive(Debug)]
pub struct StopHandle {
    tx: Option<Sender<()>>,
}

impl StopHandle {
    /// Idempotent.
    pub fn request_stop(&mut self) {
        self.tx.take();
    }
}

pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = bounded(0);
    (StopHandle { tx: Some(tx) }, StopSignal { rx })
}

/// A spawned worker plus the means to stop it and to wait for it with a bound.
pub struct TaskHandle<T> {
    name: &'static str,
    stop: StopHandle,
    // Never sent on; disconnects when the worker's closure returns or unwinds.
    finished: Receiver<()>,
    thread: JoinHandle<T>,
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Spawns `work` on a named thread, handing it the stop signal.
    pub fn spawn<F>(name: &'static str, work: F) -> Result<Self, RadarError>
    where
        F: FnOnce(StopSignal) -> T + Send + 'static,
    {
        let (stop, signal) = stop_channel();
        let (done_tx, finished) = bounded::<()>(0);

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _done = done_tx;
                work(signal)
            })
            .map_err(|e| RadarError::Spawn {
                task: name,
                reason: e.to_string(),
            })?;

        debug!(task = name, "spawned");
        Ok(Self {
            name,
            stop,
            finished,
            thread,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn request_stop(&mut self) {
        self.stop.request_stop();
    }

    /// Waits for the worker to return, but no later than `deadline`. A worker
    /// that overruns is detached and reported as a timeout.
    pub fn join_until(self, deadline: Instant) -> Result<T, RadarError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Err(RecvTimeoutError::Timeout) = self.finished.recv_timeout(remaining) {
            warn!(task = self.name, "did not stop before the deadline, detaching");
            return Err(RadarError::ShutdownTimeout { task: self.name });
        }
        self.thread
            .join()
            .map_err(|_| RadarError::TaskPanicked { task: self.name })
    }

    /// Requests a stop and joins with a bounded wait.
    pub fn stop_and_join(mut self, grace: Duration) -> Result<T, RadarError> {
        self.request_stop();
        self.join_until(Instant::now() + grace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_times_out_without_a_stop_request() {
        let (_handle, signal) = stop_channel();
        assert!(!signal.wait(Duration::from_millis(5)));
        assert!(!signal.wait(Duration::ZERO));
    }

    #[test]
    fn dropping_the_handle_raises_the_signal() {
        let (handle, signal) = stop_channel();
        drop(handle);
        let started = Instant::now();
        assert!(signal.wait(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn worker_observes_stop_and_returns_its_value() {
        let task = TaskHandle::spawn("counter", |stop| {
            let mut ticks = 0_u32;
            while !stop.wait(Duration::from_millis(1)) {
                ticks += 1;
            }
            ticks
        })
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        let ticks = task.stop_and_join(Duration::from_secs(1)).unwrap();
        assert!(ticks > 0);
    }

    #[test]
    fn overrunning_worker_is_reported_as_timeout() {
        let task = TaskHandle::spawn("stubborn", |_stop| {
            thread::sleep(Duration::from_millis(300));
        })
        .unwrap();

        let result = task.stop_and_join(Duration::from_millis(10));
        assert_eq!(result, Err(RadarError::ShutdownTimeout { task: "stubborn" }));
    }

    #[test]
    fn panicking_worker_is_reported() {
        let task = TaskHandle::spawn("faulty", |_stop| -> () { panic!("boom") }).unwrap();
        let result = task.stop_and_join(Duration::from_secs(1));
        assert_eq!(result, Err(RadarError::TaskPanicked { task: "faulty" }));
    }
}
