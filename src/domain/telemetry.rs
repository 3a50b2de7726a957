// Telemetry data domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic camera/vessel position. Altitude is meters above sea level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl Position3D {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.alt.is_finite()
    }
}

/// One sample from the flight-events feed. The wire schema carries more
/// orbital fields than the renderer needs; unknown keys are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlightRecord {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub altitude: f64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub orbital_speed: f64,
    #[serde(default)]
    pub apoapsis_altitude: f64,
    #[serde(default)]
    pub periapsis_altitude: f64,
    #[serde(default)]
    pub inclination: f64,
    #[serde(default)]
    pub eccentricity: f64,
}

impl FlightRecord {
    pub fn position(&self) -> Position3D {
        Position3D::new(self.latitude, self.longitude, self.altitude)
    }
}

/// One timestamped entry from the flight event log.
/// Levels: 0 routine record, 1 log-worthy, 2+ significant.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventRecord {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub event_details: String,
    #[serde(default)]
    pub event_level: i64,
}

/// Combined payload of the flight-events topic. Both lists are cumulative;
/// the feed re-sends everything recorded so far on every frame.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FlightEventRecord {
    #[serde(default)]
    pub flight_records: Vec<FlightRecord>,
    #[serde(default)]
    pub event_records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetOrbit {
    pub periapsis: f64,
    pub apoapsis: f64,
    pub inclination: f64,
    pub speed: f64,
}

/// Outbound message for the command topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchCommand {
    pub launch_date: DateTime<Utc>,
    pub command: String,
    pub target_orbit: TargetOrbit,
}

/// Format a signed offset from liftoff as `T+hh:mm:ss` / `T-hh:mm:ss`.
pub fn format_launch_relative(seconds: i64) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let magnitude = seconds.unsigned_abs();
    let hours = magnitude / 3600;
    let minutes = magnitude % 3600 / 60;
    let secs = magnitude % 60;
    format!("T{sign}{hours:02}:{minutes:02}:{secs:02}")
}
