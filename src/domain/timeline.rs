// Timeline placement on a cyclic 24-hour scale and auto-track arbitration
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::Serialize;

pub const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

/// Place a time of day on the inverted [0,1) scale used by the vertical
/// timeline: later times map to smaller values, so the bar grows upward.
/// 00:00 maps to 1.0 and 23:59 maps to just above 0. The wrap at midnight is
/// intentional and gets no special casing.
pub fn normalized_position(time: NaiveTime) -> f64 {
    let minutes_of_day = (time.hour() * 60 + time.minute()) as f64;
    (MINUTES_PER_DAY - minutes_of_day) / MINUTES_PER_DAY
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Normal,
    Important,
    Error,
}

impl EventLevel {
    /// Map the feed's numeric level: 0 routine, 1 log-worthy, 2+ significant.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => EventLevel::Normal,
            1 => EventLevel::Important,
            _ => EventLevel::Error,
        }
    }
}

/// A discrete event placed on the timeline.
#[derive(Debug, Clone, Serialize)]
pub struct EventMarker {
    pub time: NaiveTime,
    pub level: EventLevel,
    pub text: String,
    pub normalized_position: f64,
}

impl EventMarker {
    pub fn new(time: NaiveTime, level: EventLevel, text: String) -> Self {
        let normalized_position = normalized_position(time);
        Self {
            time,
            level,
            text,
            normalized_position,
        }
    }
}

/// Extract a time of day from the event feed's `time` field. The feed writes
/// full UTC datetimes ("2024-03-16 17:00:00+00:00") but older records carry
/// bare clock times.
pub fn parse_event_time(raw: &str) -> Option<NaiveTime> {
    if let Ok(datetime) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(datetime.time());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.time());
    }
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Arbitration between automatic now-tracking and user-driven scroll.
///
/// A user scroll disables tracking immediately and arms a single-shot flag.
/// The periodic resync clears the flag every tick regardless of outcome and
/// re-enables tracking only when the flag was not armed since the previous
/// tick, so a user action holds off auto-tracking for at most one interval.
#[derive(Debug)]
pub struct TimelineTrackingState {
    auto_track_enabled: bool,
    user_scroll_seen: bool,
    last_user_scroll_at: Option<DateTime<Utc>>,
}

impl Default for TimelineTrackingState {
    fn default() -> Self {
        Self {
            auto_track_enabled: true,
            user_scroll_seen: false,
            last_user_scroll_at: None,
        }
    }
}

impl TimelineTrackingState {
    pub fn observe_user_scroll(&mut self, at: DateTime<Utc>) {
        self.auto_track_enabled = false;
        self.user_scroll_seen = true;
        self.last_user_scroll_at = Some(at);
    }

    /// One resync tick. Returns whether auto-tracking is enabled afterwards.
    pub fn resync(&mut self) -> bool {
        if !self.user_scroll_seen {
            self.auto_track_enabled = true;
        }
        self.user_scroll_seen = false;
        self.auto_track_enabled
    }

    pub fn auto_track_enabled(&self) -> bool {
        self.auto_track_enabled
    }

    pub fn last_user_scroll_at(&self) -> Option<DateTime<Utc>> {
        self.last_user_scroll_at
    }
}
