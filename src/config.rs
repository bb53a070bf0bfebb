//! Project configuration.
//!
//! Stored as a JSON object on disk, by default `project_config.json`:
//! ```json
//! {
//!   "bus info URL": "https://api.um.warszawa.pl/api/action/busestrams_get/?resource_id=...&type=1",
//!   "bus stops URL": "https://api.um.warszawa.pl/api/action/dbstore_get/?id=...",
//!   "bus stop lines URL": "https://api.um.warszawa.pl/api/action/dbtimetable_get/?id=...",
//!   "schedule URL": "https://api.um.warszawa.pl/api/action/dbtimetable_get/?id=...",
//!   "API key": "...",
//!   "API time format": "%Y-%m-%d %H:%M:%S",
//!   "download delay (s)": 10,
//!   "download duration (s)": 3600,
//!   "bus data file": "data/buses.csv",
//!   "bus stops file": "data/bus_stops.csv",
//!   "departures folder": "data/departures",
//!   "bus recording statistics file": "data/bus_stats.json"
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::time::TimeParser;

/// Environment variable that overrides `"API key"` when set.
pub const API_KEY_ENV: &str = "BUS_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "bus info URL")]
    pub bus_info_url: String,
    #[serde(rename = "bus stops URL")]
    pub bus_stops_url: String,
    #[serde(rename = "bus stop lines URL")]
    pub bus_stop_lines_url: String,
    #[serde(rename = "schedule URL")]
    pub schedule_url: String,
    #[serde(rename = "API key")]
    pub api_key: String,
    #[serde(rename = "API time format")]
    pub time_format: String,
    #[serde(rename = "download delay (s)")]
    pub download_delay_secs: u64,
    #[serde(rename = "download duration (s)")]
    pub download_duration_secs: u64,
    #[serde(rename = "bus data file")]
    pub bus_data_file: String,
    #[serde(rename = "bus stops file")]
    pub bus_stops_file: String,
    #[serde(rename = "departures folder")]
    pub departures_folder: String,
    #[serde(rename = "bus recording statistics file")]
    pub bus_recording_stats_file: String,
    /// Upper bound on malformed responses tolerated within one logical
    /// fetch. Unbounded when absent.
    #[serde(rename = "max malformed retries", default)]
    pub max_malformed_retries: Option<u32>,
}

impl Config {
    /// Loads the config from a JSON file at `path`, applying the
    /// [`API_KEY_ENV`] override.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{path}'"))?;
        let config = Self::from_json(&content)
            .with_context(|| format!("invalid config file '{path}'"))?;
        Ok(config.with_api_key_override(std::env::var(API_KEY_ENV).ok()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        // Fail at startup rather than on the first timestamp.
        TimeParser::new(&config.time_format)?;
        Ok(config)
    }

    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.api_key = key;
        }
        self
    }

    pub fn time_parser(&self) -> Result<TimeParser> {
        TimeParser::new(&self.time_format)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_secs(self.download_delay_secs)
    }

    pub fn download_duration(&self) -> Duration {
        Duration::from_secs(self.download_duration_secs)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        bus_info_url: "http://localhost/buses?type=1".to_string(),
        bus_stops_url: "http://localhost/stops?id=1".to_string(),
        bus_stop_lines_url: "http://localhost/lines?id=2".to_string(),
        schedule_url: "http://localhost/schedule?id=3".to_string(),
        api_key: "secret".to_string(),
        time_format: "%Y-%m-%d %H:%M:%S".to_string(),
        download_delay_secs: 0,
        download_duration_secs: 1,
        bus_data_file: "buses.csv".to_string(),
        bus_stops_file: "bus_stops.csv".to_string(),
        departures_folder: "departures".to_string(),
        bus_recording_stats_file: "bus_stats.json".to_string(),
        max_malformed_retries: None,
    }
}
