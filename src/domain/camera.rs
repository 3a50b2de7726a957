// Camera waypoint math - easing, interpolation, observation offsets
use crate::domain::telemetry::Position3D;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Wall-clock length of one camera fly-to run.
pub const FLY_DURATION: Duration = Duration::from_millis(1000);

/// Cooperative re-arm interval of the frame loop.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

// Observation offset applied to every camera target so the vessel stays in
// frame instead of sitting under the camera.
pub const OBSERVATION_LON_OFFSET_DEG: f64 = 1.1;
pub const OBSERVATION_LAT_OFFSET_DEG: f64 = -1.5;
pub const OBSERVATION_ALT_OFFSET_M: f64 = 110_000.0;

/// Camera orientation in degrees. Held constant for the whole run; only the
/// position is interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Orientation {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

pub const CAMERA_ORIENTATION: Orientation = Orientation {
    heading: 303.5222252867439,
    pitch: -24.88213661971884,
    roll: 359.6511492310916 - 360.0,
};

/// Ease-in-out quadratic: accelerates to the midpoint, then decelerates.
/// Maps 0 to 0, 0.5 to 0.5, and 1 to 1 exactly.
pub fn ease_in_out_quad(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

/// Linear interpolation between two positions.
pub fn lerp(start: Position3D, end: Position3D, t: f64) -> Position3D {
    Position3D::new(
        start.lat + (end.lat - start.lat) * t,
        start.lon + (end.lon - start.lon) * t,
        start.alt + (end.alt - start.alt) * t,
    )
}

/// Where the camera should sit to observe `target`.
pub fn observation_point(target: Position3D) -> Position3D {
    Position3D::new(
        target.lat + OBSERVATION_LAT_OFFSET_DEG,
        target.lon + OBSERVATION_LON_OFFSET_DEG,
        target.alt + OBSERVATION_ALT_OFFSET_M,
    )
}

/// One camera animation run: a start/end position pair with start/end times.
#[derive(Debug, Clone, Copy)]
pub struct CameraWaypoint {
    pub start: Position3D,
    pub end: Position3D,
    pub start_time: Instant,
    pub end_time: Instant,
}

impl CameraWaypoint {
    /// Unshaped progress at `now`. Values above 1.0 mean the run is past its
    /// end time and must snap to the terminal position.
    pub fn progress_at(&self, now: Instant) -> f64 {
        let total = self.end_time.saturating_duration_since(self.start_time);
        if total.is_zero() {
            return f64::INFINITY;
        }
        now.saturating_duration_since(self.start_time).as_secs_f64() / total.as_secs_f64()
    }

    /// Eased position for an unshaped progress value. Past-terminal progress
    /// snaps to `end` exactly.
    pub fn position_at(&self, raw_progress: f64) -> Position3D {
        if raw_progress > 1.0 {
            self.end
        } else {
            lerp(self.start, self.end, ease_in_out_quad(raw_progress))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_fixed_points() {
        assert_eq!(ease_in_out_quad(0.0), 0.0);
        assert_eq!(ease_in_out_quad(0.5), 0.5);
        assert_eq!(ease_in_out_quad(1.0), 1.0);
    }

    #[test]
    fn test_ease_is_monotonic_non_decreasing() {
        let mut previous = 0.0;
        for step in 0..=1000 {
            let eased = ease_in_out_quad(step as f64 / 1000.0);
            assert!(eased >= previous, "decreased at step {step}");
            previous = eased;
        }
    }

    #[test]
    fn test_lerp_endpoints_are_exact() {
        let start = Position3D::new(10.0, 20.0, 1000.0);
        let end = Position3D::new(-35.5, 138.6, 250_000.0);
        assert_eq!(lerp(start, end, 0.0), start);
        assert_eq!(lerp(start, end, 1.0), end);
    }

    #[test]
    fn test_waypoint_terminal_snap() {
        let start = Position3D::new(0.0, 0.0, 0.0);
        let end = Position3D::new(1.0, 2.0, 3.0);
        let now = Instant::now();
        let waypoint = CameraWaypoint {
            start,
            end,
            start_time: now,
            end_time: now + FLY_DURATION,
        };
        assert_eq!(waypoint.position_at(0.0), start);
        assert_eq!(waypoint.position_at(1.0), end);
        assert_eq!(waypoint.position_at(3.7), end);
    }

    #[test]
    fn test_progress_saturates_before_start() {
        let now = Instant::now();
        let waypoint = CameraWaypoint {
            start: Position3D::new(0.0, 0.0, 0.0),
            end: Position3D::new(1.0, 1.0, 1.0),
            start_time: now + Duration::from_secs(1),
            end_time: now + Duration::from_secs(2),
        };
        assert_eq!(waypoint.progress_at(now), 0.0);
    }

    #[test]
    fn test_observation_point_offsets() {
        let target = Position3D::new(31.2, 130.9, 1000.0);
        let observed = observation_point(target);
        assert_eq!(observed.lat, 31.2 + OBSERVATION_LAT_OFFSET_DEG);
        assert_eq!(observed.lon, 130.9 + OBSERVATION_LON_OFFSET_DEG);
        assert_eq!(observed.alt, 1000.0 + OBSERVATION_ALT_OFFSET_M);
    }
}
