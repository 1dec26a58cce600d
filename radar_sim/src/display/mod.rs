// radar_sim/src/display/mod.rs

//! The radar window: range rings, sweep line, contour track, target marker
//! and laser beam, plus click-to-aim.

use bevy::prelude::*;
use radar_core::config::RadarConfig;
use std::sync::Arc;

use crate::board::SimulatedBoard;

pub mod systems;
pub mod view;

pub use view::RadarView;

/// Lets the display read back what the laser is doing.
#[derive(Resource, Clone)]
pub struct SimBoard(pub Arc<SimulatedBoard>);

/// Where the laser sits in the sensor frame (in cm).
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct LaserMount {
    pub x_cm: f64,
    pub y_cm: f64,
}

/// # RadarDisplayPlugin
/// Expects `RadarLinkPlugin` to have been added first. Without a board the
/// laser beam is not drawn.
pub struct RadarDisplayPlugin {
    pub view: RadarView,
    pub laser_mount: LaserMount,
    pub board: Option<Arc<SimulatedBoard>>,
}

impl RadarDisplayPlugin {
    pub fn new(config: &RadarConfig, board: Option<Arc<SimulatedBoard>>) -> Self {
        Self {
            view: RadarView::new(&config.display),
            laser_mount: LaserMount {
                x_cm: config.laser.mount_x_cm,
                y_cm: config.laser.mount_y_cm,
            },
            board,
        }
    }
}

impl Plugin for RadarDisplayPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.view)
            .insert_resource(self.laser_mount)
            .insert_resource(ClearColor(Color::BLACK))
            .add_systems(Startup, systems::spawn_camera)
            .add_systems(
                Update,
                (
                    systems::handle_clicks,
                    (
                        systems::draw_frame,
                        systems::draw_sweep_line,
                        systems::draw_track,
                        systems::draw_selection,
                        systems::draw_laser.run_if(resource_exists::<SimBoard>),
                    ),
                )
                    .chain(),
            );

        if let Some(board) = &self.board {
            app.insert_resource(SimBoard(Arc::clone(board)));
        }
    }
}
