// Timeline mapper - event placement and now-marker tracking
use crate::domain::telemetry::{format_launch_relative, EventRecord};
use crate::domain::timeline::{
    normalized_position, parse_event_time, EventLevel, EventMarker, TimelineTrackingState,
};
use chrono::{DateTime, NaiveTime, Utc};
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::IntervalStream;

/// Period of both the now-marker tick and the auto-track resync.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Maps timestamped events onto the cyclic timeline scale and arbitrates
/// between automatic now-tracking and user-driven scroll.
pub struct TimelineMapper {
    tracking: Mutex<TimelineTrackingState>,
    markers: RwLock<Vec<EventMarker>>,
    now_position: Mutex<f64>,
    launch_date: Mutex<Option<DateTime<Utc>>>,
}

impl TimelineMapper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tracking: Mutex::new(TimelineTrackingState::default()),
            markers: RwLock::new(Vec::new()),
            now_position: Mutex::new(normalized_position(Utc::now().time())),
            launch_date: Mutex::new(None),
        })
    }

    /// Record the liftoff instant from an accepted launch command.
    pub fn set_launch_date(&self, at: DateTime<Utc>) {
        *self.launch_date.lock() = Some(at);
    }

    /// Countdown/elapsed display relative to liftoff, `T-...` before and
    /// `T+...` after, once a launch date is known.
    pub fn launch_relative_at(&self, now: DateTime<Utc>) -> Option<String> {
        let launch = (*self.launch_date.lock())?;
        Some(format_launch_relative((now - launch).num_seconds()))
    }

    pub fn launch_relative(&self) -> Option<String> {
        self.launch_relative_at(Utc::now())
    }

    /// Replace the marker set from the latest event snapshot. Records whose
    /// timestamp cannot be read are skipped; inputs are otherwise assumed
    /// well-formed once past the channel parse step.
    pub fn set_events(&self, events: &[EventRecord]) {
        let markers: Vec<EventMarker> = events
            .iter()
            .filter_map(|event| {
                let time = parse_event_time(&event.time)?;
                let text = if event.event_details.is_empty() {
                    event.event_type.clone()
                } else {
                    format!("{}: {}", event.event_type, event.event_details)
                };
                Some(EventMarker::new(
                    time,
                    EventLevel::from_code(event.event_level),
                    text,
                ))
            })
            .collect();
        *self.markers.write() = markers;
    }

    pub fn markers(&self) -> Vec<EventMarker> {
        self.markers.read().clone()
    }

    /// Recompute the now-marker for the given time of day.
    pub fn tick_at(&self, now: NaiveTime) {
        *self.now_position.lock() = normalized_position(now);
    }

    pub fn tick(&self) {
        self.tick_at(Utc::now().time());
    }

    pub fn now_position(&self) -> f64 {
        *self.now_position.lock()
    }

    /// Called when a user-originated scroll is observed on the viewport.
    pub fn notice_user_scroll(&self) {
        self.tracking.lock().observe_user_scroll(Utc::now());
    }

    /// One auto-track resync step; returns the resulting tracking state.
    pub fn resync(&self) -> bool {
        self.tracking.lock().resync()
    }

    pub fn auto_track_enabled(&self) -> bool {
        self.tracking.lock().auto_track_enabled()
    }

    pub fn last_user_scroll_at(&self) -> Option<DateTime<Utc>> {
        self.tracking.lock().last_user_scroll_at()
    }

    /// Periodic tick and resync on the shared 1-second period. The returned
    /// handle must be aborted on teardown.
    pub fn run(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticks = IntervalStream::new(tokio::time::interval(TICK_INTERVAL));
            while ticks.next().await.is_some() {
                self.tick();
                self.resync();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(time: &str, event_type: &str, level: i64) -> EventRecord {
        EventRecord {
            time: time.to_string(),
            event_type: event_type.to_string(),
            event_details: String::new(),
            event_level: level,
        }
    }

    #[test]
    fn test_set_events_maps_markers() {
        let mapper = TimelineMapper::new();
        mapper.set_events(&[
            event("2024-03-16 13:00:00+00:00", "MECO", 2),
            event("liftoff", "unparsable", 0),
            event("17:30", "Fairing Jettisoned", 1),
        ]);

        let markers = mapper.markers();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].level, EventLevel::Error);
        assert!((markers[0].normalized_position - (1440.0 - 780.0) / 1440.0).abs() < 1e-12);
        assert_eq!(markers[1].level, EventLevel::Important);
        assert_eq!(markers[1].text, "Fairing Jettisoned");
    }

    #[test]
    fn test_tick_updates_now_marker() {
        let mapper = TimelineMapper::new();
        mapper.tick_at(NaiveTime::from_hms_opt(13, 0, 0).unwrap());
        assert!((mapper.now_position() - (1440.0 - 780.0) / 1440.0).abs() < 1e-12);
    }

    #[test]
    fn test_launch_relative_countdown() {
        let mapper = TimelineMapper::new();
        assert_eq!(mapper.launch_relative(), None);

        let launch: DateTime<Utc> = "2024-03-16T17:00:00Z".parse().unwrap();
        mapper.set_launch_date(launch);
        let before = launch - chrono::Duration::seconds(10);
        let after = launch + chrono::Duration::seconds(3725);
        assert_eq!(mapper.launch_relative_at(before).unwrap(), "T-00:00:10");
        assert_eq!(mapper.launch_relative_at(after).unwrap(), "T+01:02:05");
    }

    #[test]
    fn test_scroll_then_resync_arbitration() {
        let mapper = TimelineMapper::new();
        assert!(mapper.auto_track_enabled());

        mapper.notice_user_scroll();
        assert!(!mapper.auto_track_enabled());

        // The single-shot flag holds tracking off for one tick only: the
        // first resync clears the flag but leaves tracking off, the second
        // re-enables it. The one-tick lag is the intended arbitration, not
        // an off-by-one.
        assert!(!mapper.resync());
        assert!(mapper.resync());
    }
}
