// radar_sim/src/headless.rs

//! Running without a window: the radar still sweeps and estimates, and the
//! scan is logged at a fixed interval until the run length elapses.

use bevy::prelude::*;
use std::time::Duration;

use crate::link::{RadarLink, ScanTrack};

pub struct HeadlessPlugin {
    pub run_for: Duration,
    pub report_every: Duration,
}

impl HeadlessPlugin {
    pub fn new(run_for: Duration) -> Self {
        Self {
            run_for,
            report_every: Duration::from_secs(1),
        }
    }
}

#[derive(Resource)]
struct RunLimit(Duration);

#[derive(Resource)]
struct ReportTimer(Timer);

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(RunLimit(self.run_for))
            .insert_resource(ReportTimer(Timer::new(
                self.report_every,
                TimerMode::Repeating,
            )))
            .add_systems(Update, (report_scan, stop_after_limit));
    }
}

fn report_scan(
    time: Res<Time>,
    mut timer: ResMut<ReportTimer>,
    link: Res<RadarLink>,
    track: Res<ScanTrack>,
) {
    if !timer.0.tick(time.delta()).just_finished() {
        return;
    }
    let snapshot = link.0.snapshot();
    info!(
        angle_deg = snapshot.angle_deg,
        distance_cm = snapshot.filtered_distance_cm,
        has_estimate = snapshot.has_estimate,
        observed = track.0.observed().count(),
        "[Headless] scan"
    );
}

fn stop_after_limit(time: Res<Time>, limit: Res<RunLimit>, mut exit: EventWriter<AppExit>) {
    if time.elapsed() >= limit.0 {
        info!("[Headless] run length of {:?} reached", limit.0);
        exit.write(AppExit::Success);
    }
}
