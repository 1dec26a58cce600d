// radar_core/src/geometry.rs

//! Plane geometry for aiming the laser. All coordinates are centimetres in the
//! sensor frame: origin on the sweep servo axis, +x along the servo's 0 deg,
//! +y along its 90 deg.

use nalgebra::{Point2, Vector2};

use crate::error::GeometryError;

/// Tolerance for rounding noise in a cosine ratio before it is treated as
/// out of the `acos` domain.
const RATIO_EPSILON: f64 = 1e-12;

/// A point selected on the display, consumed once by the locator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPoint {
    pub x: f64,
    pub y: f64,
}

impl TargetPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// `acos` with an explicit domain check. Ratios a hair outside `[-1, 1]` from
/// rounding are clamped; anything further out is an error.
pub fn checked_acos(ratio: f64) -> Result<f64, GeometryError> {
    if !ratio.is_finite() || ratio.abs() > 1.0 + RATIO_EPSILON {
        return Err(GeometryError::OutOfDomain { ratio });
    }
    Ok(ratio.clamp(-1.0, 1.0).acos())
}

/// Rotates a selected point by the sonar's mounting offset so that it is
/// expressed against the mechanical zero.
///
/// The polar angle is taken as `acos(x / r)`, i.e. in `[0, pi]`; the display
/// only ever selects points in the upper half plane.
pub fn remove_sonar_offset(
    target: TargetPoint,
    sonar_offset_rad: f64,
) -> Result<Point2<f64>, GeometryError> {
    let radius = target.x.hypot(target.y);
    if radius == 0.0 {
        return Err(GeometryError::TargetAtOrigin {
            x: target.x,
            y: target.y,
        });
    }
    let angle = checked_acos(target.x / radius)? - sonar_offset_rad;
    Ok(Point2::new(radius * angle.cos(), radius * angle.sin()))
}

/// The angle (in degrees) between the laser-to-target vector and the laser's
/// reference axis, the latter being the laser mount position itself.
pub fn angle_between_deg(
    target: &Point2<f64>,
    laser_position: &Point2<f64>,
) -> Result<f64, GeometryError> {
    let axis: Vector2<f64> = laser_position.coords;
    let to_target = target - laser_position;

    let axis_norm = axis.norm();
    if axis_norm == 0.0 {
        return Err(GeometryError::ZeroLaserAxis);
    }
    let target_norm = to_target.norm();
    if target_norm == 0.0 {
        return Err(GeometryError::TargetAtLaser);
    }

    let ratio = to_target.dot(&axis) / (target_norm * axis_norm);
    Ok(checked_acos(ratio)?.to_degrees())
}

/// Mounting geometry of the laser, in the sensor frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserGeometry {
    pub laser_position: Point2<f64>,
    pub sonar_offset_rad: f64,
    pub laser_offset_deg: f64,
}

impl LaserGeometry {
    /// The raw (unclamped, untruncated) servo angle that points the laser at
    /// `target`.
    pub fn servo_angle_deg(&self, target: TargetPoint) -> Result<f64, GeometryError> {
        let corrected = remove_sonar_offset(target, self.sonar_offset_rad)?;
        let angle = angle_between_deg(&corrected, &self.laser_position)?;
        Ok(angle - self.laser_offset_deg)
    }
}

/// Truncates toward zero and clamps into the servo range.
pub fn to_servo_command(angle_deg: f64, min_angle: i32, max_angle: i32) -> i32 {
    (angle_deg.trunc() as i32).clamp(min_angle, max_angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bench_geometry() -> LaserGeometry {
        LaserGeometry {
            laser_position: Point2::new(7.5, 0.0),
            sonar_offset_rad: 0.0,
            laser_offset_deg: 10.0,
        }
    }

    #[test]
    fn zero_offset_leaves_upper_half_points_unchanged() {
        let p = remove_sonar_offset(TargetPoint::new(-4.0, 9.0), 0.0).unwrap();
        assert_abs_diff_eq!(p.x, -4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 9.0, epsilon = 1e-12);
    }

    #[test]
    fn sonar_offset_rotates_the_point() {
        let p = remove_sonar_offset(TargetPoint::new(0.0, 10.0), 10f64.to_radians()).unwrap();
        let expected = 80f64.to_radians();
        assert_abs_diff_eq!(p.x, 10.0 * expected.cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 10.0 * expected.sin(), epsilon = 1e-12);
    }

    #[test]
    fn target_straight_ahead_of_the_laser() {
        // v = (0, 10) is perpendicular to the (7.5, 0) axis: 90 deg - 10 deg.
        let angle = bench_geometry()
            .servo_angle_deg(TargetPoint::new(7.5, 10.0))
            .unwrap();
        assert_abs_diff_eq!(angle, 80.0, epsilon = 1e-9);
    }

    #[test]
    fn matches_the_direct_formula() {
        let geometry = bench_geometry();
        for (x, y) in [(-12.0, 5.0), (3.0, 20.0), (15.0, 1.0), (-0.5, 0.5)] {
            let angle = geometry.servo_angle_deg(TargetPoint::new(x, y)).unwrap();
            let (vx, vy) = (x - 7.5, y);
            let direct = ((vx * 7.5) / ((vx * vx + vy * vy).sqrt() * 7.5))
                .acos()
                .to_degrees()
                - 10.0;
            assert_abs_diff_eq!(angle, direct, epsilon = 1e-9);
        }
    }

    #[test]
    fn target_on_the_laser_is_degenerate() {
        assert_eq!(
            bench_geometry().servo_angle_deg(TargetPoint::new(7.5, 0.0)),
            Err(GeometryError::TargetAtLaser)
        );
    }

    #[test]
    fn target_on_the_rotation_axis_is_degenerate() {
        assert!(matches!(
            bench_geometry().servo_angle_deg(TargetPoint::new(0.0, 0.0)),
            Err(GeometryError::TargetAtOrigin { .. })
        ));
    }

    #[test]
    fn laser_on_the_axis_is_degenerate() {
        let geometry = LaserGeometry {
            laser_position: Point2::origin(),
            ..bench_geometry()
        };
        assert_eq!(
            geometry.servo_angle_deg(TargetPoint::new(3.0, 4.0)),
            Err(GeometryError::ZeroLaserAxis)
        );
    }

    #[test]
    fn acos_domain_is_checked() {
        assert!(checked_acos(1.0 + 1e-15).is_ok());
        assert!(matches!(
            checked_acos(1.5),
            Err(GeometryError::OutOfDomain { .. })
        ));
        assert!(checked_acos(f64::NAN).is_err());
    }

    #[test]
    fn servo_command_truncates_and_clamps() {
        assert_eq!(to_servo_command(79.99, 0, 180), 79);
        assert_eq!(to_servo_command(-7.4, 0, 180), 0);
        assert_eq!(to_servo_command(185.2, 0, 180), 180);
    }
}
