use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

pub const DEFAULT_API_BASE: &str = "https://public.radio.co";
pub const DEFAULT_STATION_ID: &str = "sefac315e7";
pub const DEFAULT_STREAM_URL: &str = "https://streaming.radio.co/sefac315e7/listen";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub station: StationConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_station_id")]
    pub station_id: String,
    #[serde(default = "default_stream_url")]
    pub stream_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// 0.0..=1.0, applied every time the stream is (re)opened.
    #[serde(default = "default_volume")]
    pub volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            station_id: default_station_id(),
            stream_url: default_stream_url(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_station_id() -> String {
    DEFAULT_STATION_ID.to_string()
}

fn default_stream_url() -> String {
    DEFAULT_STREAM_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    crate::poller::DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_volume() -> f32 {
    1.0
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("cultradio/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Read `config.toml` if present.  A missing file is not an error; the
    /// file is never created or rewritten.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Zero would make `tokio::time::interval` panic, so clamp to one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.poll_interval_secs.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn volume(&self) -> f32 {
        self.playback.volume.clamp(0.0, 1.0)
    }
}
