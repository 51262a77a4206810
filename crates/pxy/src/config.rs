//! Configuration loading

use anyhow::{Context, Result};
use pxy_core::{Auth, CacheConfig, Resource, TargetConfig};
use pxy_proxy::UpstreamClientConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Append-only log file; logs go to stdout when unset
    #[serde(default)]
    pub log_path: Option<String>,
    #[serde(default = "default_target_scheme")]
    pub target_scheme: String,
    pub target_host: String,
    /// Maximum cache size in megabytes (0 = default)
    #[serde(default)]
    pub max_memory: u64,
    /// Megabytes freed below `max_memory` on eviction (0 = default)
    #[serde(default, alias = "size_to_prung")]
    pub size_to_prune: u64,
    /// Default TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl: i64,
    /// Credentials required by FLUSH
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Upstream client configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub skip_tls_verify: bool,
}

impl UpstreamConfig {
    pub fn client_config(&self) -> UpstreamClientConfig {
        UpstreamClientConfig {
            timeout: self.timeout_secs.map(Duration::from_secs),
            skip_tls_verify: self.skip_tls_verify,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Prometheus exporter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_address")]
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_metrics_address(),
        }
    }
}

// Default value functions
fn default_target_scheme() -> String {
    "http".to_string()
}

fn default_ttl() -> i64 {
    60
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    789
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_metrics_address() -> String {
    "127.0.0.1:9000".to_string()
}

impl Config {
    /// Load configuration from a JSON or TOML file, with `PXY_*` environment
    /// overrides (nested keys separated by `__`, e.g. `PXY_SERVER__PORT`)
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        if !config_path.exists() {
            anyhow::bail!("Config file not found: {}", path);
        }

        let config: Config = config::Config::builder()
            .add_source(config::File::from(config_path))
            .add_source(
                config::Environment::with_prefix("PXY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config file: {}", path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.target_scheme != "http" && self.target_scheme != "https" {
            anyhow::bail!("Unsupported target_scheme: {}", self.target_scheme);
        }
        if self.target_host.is_empty() {
            anyhow::bail!("target_host must not be empty");
        }
        if self.ttl < 0 {
            anyhow::bail!("ttl must not be negative");
        }
        Ok(())
    }

    /// Top-level target configuration inherited by every resource
    pub fn default_target(&self) -> TargetConfig {
        TargetConfig {
            target_scheme: self.target_scheme.clone(),
            target_host: self.target_host.clone(),
            ttl: self.ttl,
            auth: self.auth.clone(),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::from_megabytes(self.max_memory, self.size_to_prune)
    }
}
