//! Configuration management

use crate::domain::poller::PollerSettings;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between status-check ticks, in milliseconds
    pub interval_ms: u64,
    /// Hard ceiling: force-stop after this many ticks
    pub max_ticks: u32,
    /// Minimum ticks before an all-resolved result stops polling
    pub debounce_ticks: u32,
    /// Fallback reload cadence (every Nth tick)
    pub fallback_reload_every: u32,
    /// Opportunistic reload cadence (every Nth tick)
    pub refresh_reload_every: u32,
    /// Registry entries older than this are treated as abandoned
    pub stale_call_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            polling: PollingConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            max_ticks: 60,
            debounce_ticks: 3,
            fallback_reload_every: 3,
            refresh_reload_every: 5,
            stale_call_secs: 600,
        }
    }
}

impl Config {
    /// Load from an optional `callboard.toml` in the working directory
    /// plus `CALLBOARD_*` environment overrides
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("callboard").required(false))
            .add_source(config::Environment::with_prefix("CALLBOARD").separator("__"))
            .build()
            .map_err(|e| DomainError::Configuration(e.to_string()))?;
        settings
            .try_deserialize()
            .map_err(|e| DomainError::Configuration(e.to_string()))
    }
}

impl PollingConfig {
    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: Duration::from_millis(self.interval_ms),
            max_ticks: self.max_ticks,
            debounce_ticks: self.debounce_ticks,
            fallback_reload_every: self.fallback_reload_every,
            refresh_reload_every: self.refresh_reload_every,
            stale_after: ChronoDuration::seconds(self.stale_call_secs),
        }
    }
}
