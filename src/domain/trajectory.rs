// Trajectory buffer and de-duplicated scalar series
use crate::domain::telemetry::Position3D;
use std::collections::HashMap;

/// Series name used for the altitude-over-time chart.
pub const ALTITUDE_SERIES: &str = "altitude";

/// Append-only trajectory derived from the flight-events feed.
///
/// Positions are stored in arrival order and never deduplicated; the polyline
/// renderer draws every sample. Scalar series collapse consecutive equal
/// values so unchanged telemetry between polls does not force a re-render.
#[derive(Debug, Default)]
pub struct TrajectoryStore {
    positions: Vec<Position3D>,
    series: HashMap<String, Vec<f64>>,
}

impl TrajectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a position. Arrival order is authoritative; no reordering and
    /// no timestamp validation. Malformed (non-finite) positions are dropped
    /// here so they never reach the camera animator.
    pub fn append(&mut self, position: Position3D) {
        if !position.is_valid() {
            tracing::warn!(?position, "dropping malformed position");
            return;
        }
        self.positions.push(position);
    }

    /// Append a value to a named scalar series, skipping it when it equals
    /// the series' current last value. Non-finite values are dropped.
    pub fn append_scalar(&mut self, series: &str, value: f64) {
        if !value.is_finite() {
            return;
        }
        let points = self.series.entry(series.to_string()).or_default();
        if points.last() == Some(&value) {
            return;
        }
        points.push(value);
    }

    /// Most recently appended position, if any.
    pub fn latest(&self) -> Option<Position3D> {
        self.positions.last().copied()
    }

    /// Read-only view of all positions for polyline rendering.
    pub fn snapshot(&self) -> &[Position3D] {
        &self.positions
    }

    pub fn scalar_series(&self, series: &str) -> &[f64] {
        self.series.get(series).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Clear everything. Only called on mission restart.
    pub fn reset(&mut self) {
        self.positions.clear();
        self.series.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_series_collapses_consecutive_equal_values() {
        let mut store = TrajectoryStore::new();
        store.append_scalar(ALTITUDE_SERIES, 100.0);
        store.append_scalar(ALTITUDE_SERIES, 100.0);
        store.append_scalar(ALTITUDE_SERIES, 150.0);
        assert_eq!(store.scalar_series(ALTITUDE_SERIES), &[100.0, 150.0]);
    }

    #[test]
    fn test_scalar_series_keeps_non_consecutive_repeats() {
        let mut store = TrajectoryStore::new();
        store.append_scalar(ALTITUDE_SERIES, 100.0);
        store.append_scalar(ALTITUDE_SERIES, 150.0);
        store.append_scalar(ALTITUDE_SERIES, 100.0);
        assert_eq!(store.scalar_series(ALTITUDE_SERIES), &[100.0, 150.0, 100.0]);
    }

    #[test]
    fn test_scalar_series_drops_non_numeric_values() {
        let mut store = TrajectoryStore::new();
        store.append_scalar(ALTITUDE_SERIES, f64::NAN);
        store.append_scalar(ALTITUDE_SERIES, f64::INFINITY);
        store.append_scalar(ALTITUDE_SERIES, 42.0);
        assert_eq!(store.scalar_series(ALTITUDE_SERIES), &[42.0]);
    }

    #[test]
    fn test_positions_are_never_deduplicated() {
        let mut store = TrajectoryStore::new();
        let p = Position3D::new(10.0, 20.0, 1000.0);
        store.append(p);
        store.append(p);
        store.append(Position3D::new(11.0, 21.0, 2000.0));
        assert_eq!(store.len(), 3);
        assert_eq!(store.latest(), Some(Position3D::new(11.0, 21.0, 2000.0)));
    }

    #[test]
    fn test_malformed_positions_are_rejected() {
        let mut store = TrajectoryStore::new();
        store.append(Position3D::new(f64::NAN, 20.0, 1000.0));
        assert!(store.is_empty());
        assert_eq!(store.latest(), None);
    }

    #[test]
    fn test_reset_clears_positions_and_series() {
        let mut store = TrajectoryStore::new();
        store.append(Position3D::new(1.0, 2.0, 3.0));
        store.append_scalar(ALTITUDE_SERIES, 3.0);
        store.reset();
        assert!(store.is_empty());
        assert!(store.scalar_series(ALTITUDE_SERIES).is_empty());
    }
}
