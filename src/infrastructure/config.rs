use crate::domain::topic::Topic;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Base websocket URL of the telemetry source, e.g. `ws://host:8000/ws`.
    pub base_url: String,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// The deployment-defined topic set. Each entry becomes one channel.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl TelemetryConfig {
    pub fn endpoint(&self, channel: &ChannelConfig) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            channel.path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    pub topic: Topic,
    pub path: String,
}

/// Bounded exponential backoff tuning for channel reconnects.
#[derive(Debug, Deserialize, Clone)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl ReconnectConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

/// The media relay is consumed only as an opaque stream URL.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MediaConfig {
    #[serde(default)]
    pub live_stream_url: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_initial_ms() -> u64 {
    1000
}

fn default_max_ms() -> u64 {
    30_000
}

pub fn load_service_config() -> anyhow::Result<ServiceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/channels"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
