// Telemetry topic identifiers
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of live data feeds. Each topic maps to one full-duplex
/// connection carrying UTF-8 JSON frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    OrbitInfo,
    SurfaceInfo,
    AtmosphereInfo,
    DeltaVStatus,
    ThermalStatus,
    SatelliteBus,
    Communication,
    FairingStatus,
    EngineStatus,
    TankStatus,
    FlightEvents,
    Command,
}

impl Topic {
    pub const ALL: [Topic; 12] = [
        Topic::OrbitInfo,
        Topic::SurfaceInfo,
        Topic::AtmosphereInfo,
        Topic::DeltaVStatus,
        Topic::ThermalStatus,
        Topic::SatelliteBus,
        Topic::Communication,
        Topic::FairingStatus,
        Topic::EngineStatus,
        Topic::TankStatus,
        Topic::FlightEvents,
        Topic::Command,
    ];

    /// Wire name used in endpoint paths and URL parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::OrbitInfo => "orbit-info",
            Topic::SurfaceInfo => "surface-info",
            Topic::AtmosphereInfo => "atmosphere-info",
            Topic::DeltaVStatus => "delta-v-status",
            Topic::ThermalStatus => "thermal-status",
            Topic::SatelliteBus => "satellite-bus",
            Topic::Communication => "communication",
            Topic::FairingStatus => "fairing-status",
            Topic::EngineStatus => "engine-status",
            Topic::TankStatus => "tank-status",
            Topic::FlightEvents => "flight-events",
            Topic::Command => "command",
        }
    }

    pub fn parse(name: &str) -> Option<Topic> {
        Topic::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
