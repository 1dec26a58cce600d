// radar_sim/src/display/systems.rs

use bevy::color::palettes::css::{BLUE, LIME, ORANGE_RED, RED};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use radar_core::prelude::*;
use std::f32::consts::PI;

use super::{LaserMount, RadarView, SimBoard};
use crate::link::{RadarLink, ScanTrack, Selection};

const RING_SEGMENTS: usize = 96;
const POINT_RADIUS_PX: f32 = 3.5;
const MARKER_RADIUS_PX: f32 = 10.0;

// =========================================================================
// == Setup ==
// =========================================================================

pub fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

// =========================================================================
// == Input ==
// =========================================================================

/// Left click aims the laser at the cursor; right click clears the target
/// and turns the laser off.
pub fn handle_clicks(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    view: Res<RadarView>,
    link: Res<RadarLink>,
    mut selection: ResMut<Selection>,
) {
    if buttons.just_pressed(MouseButton::Right) {
        selection.clear(&link);
        info!("[Display] target cleared");
        return;
    }
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }

    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let target = view.cursor_to_sensor(cursor);
    info!("[Display] aiming at ({:.1}, {:.1}) cm", target.x, target.y);
    selection.aim(&link, target);
}

// =========================================================================
// == Drawing ==
// =========================================================================

/// Three range rings and the baseline through the sweep axis.
pub fn draw_frame(mut gizmos: Gizmos, view: Res<RadarView>) {
    let center = view.center();
    for fraction in [1.0 / 3.0, 2.0 / 3.0, 1.0] {
        let radius = view.radius_px() * fraction;
        let ring = (0..=RING_SEGMENTS).map(|i| {
            let theta = PI * i as f32 / RING_SEGMENTS as f32;
            center + Vec2::new(theta.cos(), theta.sin()) * radius
        });
        gizmos.linestrip_2d(ring, LIME);
    }

    let half_width = view.window_size().x / 2.0;
    gizmos.line_2d(
        Vec2::new(-half_width, center.y),
        Vec2::new(half_width, center.y),
        LIME,
    );
}

pub fn draw_sweep_line(mut gizmos: Gizmos, view: Res<RadarView>, link: Res<RadarLink>) {
    let angle = link.0.sweep_angle_deg() as f64;
    gizmos.line_2d(view.center(), view.ray_end(angle, view.radius_px()), LIME);
}

/// Every in-range reading, joined to its neighbour when they are close.
pub fn draw_track(mut gizmos: Gizmos, view: Res<RadarView>, track: Res<ScanTrack>) {
    let to_world = |p: &nalgebra::Point2<f64>| view.sensor_to_world(p.x, p.y);
    for element in track.0.contour(view.max_range_cm(), view.contour_link_cm()) {
        match element {
            ContourElement::Point(p) => {
                gizmos.circle_2d(to_world(&p), POINT_RADIUS_PX, RED);
            }
            ContourElement::Segment(a, b) => {
                gizmos.line_2d(to_world(&a), to_world(&b), RED);
            }
        }
    }
}

pub fn draw_selection(mut gizmos: Gizmos, view: Res<RadarView>, selection: Res<Selection>) {
    if let Some(target) = selection.0 {
        gizmos.circle_2d(view.sensor_to_world(target.x, target.y), MARKER_RADIUS_PX, BLUE);
    }
}

/// The beam from the laser mount to the target while the laser is on.
pub fn draw_laser(
    mut gizmos: Gizmos,
    view: Res<RadarView>,
    selection: Res<Selection>,
    board: Res<SimBoard>,
    mount: Res<LaserMount>,
) {
    let (Some(target), true) = (selection.0, board.0.laser_state().on) else {
        return;
    };
    let from = view.sensor_to_world(mount.x_cm, mount.y_cm);
    gizmos.line_2d(from, view.sensor_to_world(target.x, target.y), ORANGE_RED);
}
