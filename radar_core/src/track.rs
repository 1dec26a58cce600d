// radar_core/src/track.rs

use nalgebra::Point2;

/// The last reading seen at one integer sweep angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub distance_cm: f64,
    pub angle_rad: f64,
}

impl TrackPoint {
    /// Position in the sensor frame (in cm).
    pub fn position(&self) -> Point2<f64> {
        Point2::new(
            self.distance_cm * self.angle_rad.cos(),
            self.distance_cm * self.angle_rad.sin(),
        )
    }
}

/// What the display draws for the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContourElement {
    Point(Point2<f64>),
    Segment(Point2<f64>, Point2<f64>),
}

/// One slot per integer angle `0..=max_angle`, each holding the latest
/// reading at that angle. Used to redraw the whole sweep history every frame.
#[derive(Debug, Clone)]
pub struct MeasurementTrack {
    slots: Vec<Option<TrackPoint>>,
}

impl MeasurementTrack {
    pub fn new(max_angle: i32) -> Self {
        Self {
            slots: vec![None; max_angle.max(0) as usize + 1],
        }
    }

    /// Stores a reading. Returns `false` if the angle has no slot.
    pub fn record(&mut self, angle_deg: i32, distance_cm: f64) -> bool {
        let Some(slot) = usize::try_from(angle_deg)
            .ok()
            .and_then(|i| self.slots.get_mut(i))
        else {
            return false;
        };
        *slot = Some(TrackPoint {
            distance_cm,
            angle_rad: (angle_deg as f64).to_radians(),
        });
        true
    }

    pub fn get(&self, angle_deg: i32) -> Option<&TrackPoint> {
        usize::try_from(angle_deg)
            .ok()
            .and_then(|i| self.slots.get(i))
            .and_then(Option::as_ref)
    }

    /// The reading one degree further on, if there is one.
    pub fn neighbor(&self, angle_deg: i32) -> Option<&TrackPoint> {
        self.get(angle_deg + 1)
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn observed(&self) -> impl Iterator<Item = (i32, &TrackPoint)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|p| (i as i32, p)))
    }

    /// Every reading within `max_range_cm`, plus a segment to the next
    /// angle's reading when the two lie closer than `link_cm`. This traces
    /// the contour of whatever the sonar is looking at.
    pub fn contour(&self, max_range_cm: f64, link_cm: f64) -> Vec<ContourElement> {
        let in_range = |p: &&TrackPoint| p.distance_cm < max_range_cm;
        let mut elements = Vec::new();
        for (angle, point) in self.observed().filter(|(_, p)| in_range(p)) {
            let here = point.position();
            elements.push(ContourElement::Point(here));

            if let Some(next) = self.neighbor(angle).filter(in_range) {
                let there = next.position();
                if nalgebra::distance(&here, &there) < link_cm {
                    elements.push(ContourElement::Segment(here, there));
                }
            }
        }
        elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn record_rejects_angles_without_a_slot() {
        let mut track = MeasurementTrack::new(180);
        assert!(track.record(0, 5.0));
        assert!(track.record(180, 5.0));
        assert!(!track.record(181, 5.0));
        assert!(!track.record(-1, 5.0));
        assert_eq!(track.observed().count(), 2);
    }

    #[test]
    fn neighbor_lookup_is_bounds_checked() {
        let mut track = MeasurementTrack::new(180);
        track.record(180, 12.0);
        track.record(40, 12.0);
        assert!(track.neighbor(180).is_none());
        assert!(track.neighbor(39).is_some());
        assert!(track.neighbor(40).is_none());
    }

    #[test]
    fn position_uses_the_sensor_frame() {
        let mut track = MeasurementTrack::new(180);
        track.record(90, 10.0);
        let p = track.get(90).unwrap().position();
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn close_neighbours_are_linked_and_far_ones_are_not() {
        let mut track = MeasurementTrack::new(180);
        track.record(10, 20.0);
        track.record(11, 20.2);
        track.record(12, 5.0);

        let contour = track.contour(30.0, 1.0);
        let segments = contour
            .iter()
            .filter(|e| matches!(e, ContourElement::Segment(..)))
            .count();
        let points = contour
            .iter()
            .filter(|e| matches!(e, ContourElement::Point(..)))
            .count();
        assert_eq!(points, 3);
        assert_eq!(segments, 1);
    }

    #[test]
    fn out_of_range_readings_are_not_drawn() {
        let mut track = MeasurementTrack::new(180);
        track.record(10, 45.0);
        track.record(11, 20.0);
        assert_eq!(track.contour(30.0, 100.0).len(), 1);

        track.clear();
        assert!(track.contour(30.0, 100.0).is_empty());
    }
}
