// radar_sim/src/display/view.rs

//! Pixel <-> centimetre mapping for the radar plot.
//!
//! The sensor frame has its origin on the sweep axis, +x right and +y up.
//! The radar's centre sits at the middle of the window's bottom edge (less a
//! margin), and the full plotted range spans the window height.

use bevy::prelude::*;
use radar_core::config::DisplayConfig;
use radar_core::geometry::TargetPoint;

/// Border around the plot (in px).
pub const MARGIN_PX: f32 = 8.0;

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct RadarView {
    width: f32,
    height: f32,
    /// Centimetres per pixel.
    scale: f64,
    max_range_cm: f64,
    contour_link_cm: f64,
}

impl RadarView {
    pub fn new(display: &DisplayConfig) -> Self {
        let scale = display.scale();
        Self {
            width: display.window_width,
            height: display.window_height,
            scale,
            max_range_cm: display.max_range_cm,
            contour_link_cm: display.contour_link_px * scale,
        }
    }

    pub fn window_size(&self) -> Vec2 {
        Vec2::new(self.width + 2.0 * MARGIN_PX, self.height + 2.0 * MARGIN_PX)
    }

    /// World position of the sweep axis. Bevy's 2D world has its origin at
    /// the window centre with +y up.
    pub fn center(&self) -> Vec2 {
        Vec2::new(0.0, -self.height / 2.0)
    }

    /// Radius of the outermost ring (in px).
    pub fn radius_px(&self) -> f32 {
        self.height
    }

    pub fn max_range_cm(&self) -> f64 {
        self.max_range_cm
    }

    pub fn contour_link_cm(&self) -> f64 {
        self.contour_link_cm
    }

    pub fn sensor_to_world(&self, x_cm: f64, y_cm: f64) -> Vec2 {
        self.center() + Vec2::new((x_cm / self.scale) as f32, (y_cm / self.scale) as f32)
    }

    /// Converts a cursor position (window pixels, origin top-left, +y down)
    /// into a sensor-frame point.
    pub fn cursor_to_sensor(&self, cursor: Vec2) -> TargetPoint {
        let axis = Vec2::new(self.width / 2.0 + MARGIN_PX, self.height + MARGIN_PX);
        let dx = (cursor.x - axis.x) as f64;
        let dy = (axis.y - cursor.y) as f64;
        TargetPoint::new(dx * self.scale, dy * self.scale)
    }

    /// The end of a line from the axis at `angle_deg`, `length_px` long.
    pub fn ray_end(&self, angle_deg: f64, length_px: f32) -> Vec2 {
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        self.center() + Vec2::new(cos as f32, sin as f32) * length_px
    }
}
