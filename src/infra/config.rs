//! Configuration loading from TOML files
//!
//! Config file is selected via the --config command line argument;
//! a missing or invalid file falls back to built-in defaults.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Interval between background tracking cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Concurrent provider calls allowed across the whole process
    #[serde(default = "default_provider_permits")]
    pub provider_permits: usize,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_provider_permits() -> usize {
    1200
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            provider_permits: default_provider_permits(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsConfig {
    /// Radius in statute miles within which a visit earns an attraction
    #[serde(default = "default_buffer_miles")]
    pub buffer_miles: f64,
    /// Radius for general nearby-attraction queries; independent of
    /// the reward buffer
    #[serde(default = "default_attraction_range_miles")]
    pub attraction_range_miles: f64,
}

fn default_buffer_miles() -> f64 {
    10.0
}

fn default_attraction_range_miles() -> f64 {
    200.0
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            buffer_miles: default_buffer_miles(),
            attraction_range_miles: default_attraction_range_miles(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_gps_latency_min_ms")]
    pub gps_latency_min_ms: u64,
    #[serde(default = "default_gps_latency_max_ms")]
    pub gps_latency_max_ms: u64,
    /// Probability that a position fetch fails this cycle
    #[serde(default = "default_gps_failure_rate")]
    pub gps_failure_rate: f64,
    #[serde(default = "default_points_latency_min_ms")]
    pub points_latency_min_ms: u64,
    #[serde(default = "default_points_latency_max_ms")]
    pub points_latency_max_ms: u64,
    #[serde(default)]
    pub points_failure_rate: f64,
}

fn default_gps_latency_min_ms() -> u64 {
    30
}

fn default_gps_latency_max_ms() -> u64 {
    100
}

fn default_gps_failure_rate() -> f64 {
    0.01
}

fn default_points_latency_min_ms() -> u64 {
    1
}

fn default_points_latency_max_ms() -> u64 {
    100
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            gps_latency_min_ms: default_gps_latency_min_ms(),
            gps_latency_max_ms: default_gps_latency_max_ms(),
            gps_failure_rate: default_gps_failure_rate(),
            points_latency_min_ms: default_points_latency_min_ms(),
            points_latency_max_ms: default_points_latency_max_ms(),
            points_failure_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopulationConfig {
    /// Synthetic users seeded at startup
    #[serde(default = "default_user_count")]
    pub user_count: usize,
}

fn default_user_count() -> usize {
    100
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self { user_count: default_user_count() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// File path for population snapshots (JSONL format)
    #[serde(default = "default_egress_file")]
    pub file: String,
}

fn default_egress_file() -> String {
    "snapshots.jsonl".to_string()
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { file: default_egress_file() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub egress: EgressConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    tracking_interval_secs: u64,
    provider_permits: usize,
    reward_buffer_miles: f64,
    attraction_range_miles: f64,
    gps_latency_min_ms: u64,
    gps_latency_max_ms: u64,
    gps_failure_rate: f64,
    points_latency_min_ms: u64,
    points_latency_max_ms: u64,
    points_failure_rate: f64,
    user_count: usize,
    egress_file: String,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        Self {
            tracking_interval_secs: toml_config.tracking.interval_secs,
            provider_permits: toml_config.tracking.provider_permits,
            reward_buffer_miles: toml_config.rewards.buffer_miles,
            attraction_range_miles: toml_config.rewards.attraction_range_miles,
            gps_latency_min_ms: toml_config.providers.gps_latency_min_ms,
            gps_latency_max_ms: toml_config.providers.gps_latency_max_ms,
            gps_failure_rate: toml_config.providers.gps_failure_rate,
            points_latency_min_ms: toml_config.providers.points_latency_min_ms,
            points_latency_max_ms: toml_config.providers.points_latency_max_ms,
            points_failure_rate: toml_config.providers.points_failure_rate,
            user_count: toml_config.population.user_count,
            egress_file: toml_config.egress.file,
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration - tries the TOML file, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn tracking_interval_secs(&self) -> u64 {
        self.tracking_interval_secs
    }

    pub fn provider_permits(&self) -> usize {
        self.provider_permits
    }

    pub fn reward_buffer_miles(&self) -> f64 {
        self.reward_buffer_miles
    }

    pub fn attraction_range_miles(&self) -> f64 {
        self.attraction_range_miles
    }

    pub fn gps_latency_min_ms(&self) -> u64 {
        self.gps_latency_min_ms
    }

    pub fn gps_latency_max_ms(&self) -> u64 {
        self.gps_latency_max_ms
    }

    pub fn gps_failure_rate(&self) -> f64 {
        self.gps_failure_rate
    }

    pub fn points_latency_min_ms(&self) -> u64 {
        self.points_latency_min_ms
    }

    pub fn points_latency_max_ms(&self) -> u64 {
        self.points_latency_max_ms
    }

    pub fn points_failure_rate(&self) -> f64 {
        self.points_failure_rate
    }

    pub fn user_count(&self) -> usize {
        self.user_count
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}
