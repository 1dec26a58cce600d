// radar_sim/src/link.rs

//! The bridge between the radar runtime's threads and the Bevy schedule.
//! Shared by the windowed display and the headless runner.

use bevy::prelude::*;
use radar_core::prelude::*;

// =========================================================================
// == Resources ==
// =========================================================================

/// The app's only way into the running radar.
#[derive(Resource, Clone)]
pub struct RadarLink(pub RadarHandle);

/// The per-angle history sampled from the snapshot bus once per frame.
#[derive(Resource, Debug)]
pub struct ScanTrack(pub MeasurementTrack);

/// The target the laser was last sent to, if it is still wanted.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct Selection(pub Option<TargetPoint>);

impl Selection {
    /// Records the target and queues the aim.
    pub fn aim(&mut self, link: &RadarLink, target: TargetPoint) {
        self.0 = Some(target);
        link.0.submit_target(target.x, target.y);
    }

    /// Forgets the target and queues a laser-off.
    pub fn clear(&mut self, link: &RadarLink) {
        self.0 = None;
        link.0.clear_target();
    }
}

// =========================================================================
// == Plugin ==
// =========================================================================

pub struct RadarLinkPlugin {
    pub handle: RadarHandle,
    /// Highest sweep angle the track needs a slot for.
    pub max_angle: i32,
}

impl Plugin for RadarLinkPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(RadarLink(self.handle.clone()))
            .insert_resource(ScanTrack(MeasurementTrack::new(self.max_angle)))
            .init_resource::<Selection>()
            .add_systems(
                Update,
                (watch_fatal, sample_scan, drain_locate_outcomes).chain(),
            );
    }
}

// =========================================================================
// == Systems ==
// =========================================================================

/// Ends the app with an error code once any radar task has given up.
fn watch_fatal(link: Res<RadarLink>, mut exit: EventWriter<AppExit>) {
    if let Some(error) = link.0.take_fatal() {
        error!("[Radar] fatal: {error}; closing");
        exit.write(AppExit::error());
    }
}

/// Stores the latest {angle, distance} pair in its angle's slot.
fn sample_scan(link: Res<RadarLink>, mut track: ResMut<ScanTrack>) {
    record_snapshot(&mut track.0, link.0.snapshot());
}

/// Records `snapshot` unless the estimator has yet to see a real echo, in
/// which case its distance is only the mount offset.
pub fn record_snapshot(track: &mut MeasurementTrack, snapshot: ScanSnapshot) -> bool {
    snapshot.has_estimate && track.record(snapshot.angle_deg, snapshot.filtered_distance_cm)
}

/// A failed aim leaves the laser off, so the marker goes too.
fn drain_locate_outcomes(link: Res<RadarLink>, mut selection: ResMut<Selection>) {
    for outcome in link.0.locate_outcomes() {
        match outcome.result {
            Ok(angle) => debug!(
                "[Radar] laser at {angle} deg for ({:.1}, {:.1})",
                outcome.target.x, outcome.target.y
            ),
            Err(e) => {
                warn!("[Radar] could not aim at ({:.1}, {:.1}): {e}", outcome.target.x, outcome.target.y);
                if selection.0 == Some(outcome.target) {
                    selection.0 = None;
                }
            }
        }
    }
}
