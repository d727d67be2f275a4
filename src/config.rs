//! Configuration loading and management.

use crate::cache::{CacheSettings, pokeapi};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Bot identity and dispatch behavior.
    #[serde(default)]
    pub bot: BotConfig,
    /// Durable resource cache.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Remote API endpoints.
    #[serde(default)]
    pub apis: ApisConfig,
    /// Prometheus endpoint.
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Application id used in the command registration payload.
    #[serde(default)]
    pub application_id: u64,
    /// Let callers with ADMINISTRATOR skip per-command caller rights.
    #[serde(default = "default_true")]
    pub admin_override: bool,
    /// How long a confirmation prompt waits for an answer.
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            application_id: 0,
            admin_override: true,
            confirm_timeout_secs: default_confirm_timeout(),
        }
    }
}

impl BotConfig {
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory holding `{api}/{resource}/{id}.json` files.
    #[serde(default = "default_cache_root")]
    pub root: PathBuf,
    /// Age after which a cached resource is refetched.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    /// Size of the direct-indexed store; larger ids use a side map.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Ask the API for its resource count at startup and size the store
    /// from it.
    #[serde(default)]
    pub size_from_remote: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
            ttl_secs: default_cache_ttl(),
            max_entries: default_max_entries(),
            size_from_remote: false,
        }
    }
}

impl CacheConfig {
    pub fn settings(&self) -> CacheSettings {
        CacheSettings {
            root: self.root.clone(),
            ttl: Duration::from_secs(self.ttl_secs),
            max_entries: self.max_entries,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApisConfig {
    #[serde(default)]
    pub pokeapi: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_pokeapi_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_pokeapi_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

// =============================================================================
// Defaults
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_bot_name() -> String {
    "B12".to_string()
}

fn default_confirm_timeout() -> u64 {
    15
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("cache")
}

fn default_cache_ttl() -> u64 {
    crate::cache::DEFAULT_TTL.as_secs()
}

/// National dex size plus the unused slot 0.
fn default_max_entries() -> usize {
    1025
}

fn default_pokeapi_url() -> String {
    pokeapi::DEFAULT_BASE_URL.to_string()
}

fn default_metrics_port() -> u16 {
    9090
}
