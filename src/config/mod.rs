//! Configuration management for pelican-advertise
//!
//! This module handles loading and validating configuration from a TOML file
//! and `PELICAN_*` environment variables, and exposes the read-only views the
//! advertisement protocol needs ([`ConfigProvider`], [`ServiceNameResolver`]).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::server::{ConfiguredServer, ManagedServer, NamespaceAd, ServerType};

/// Default advertisement period
pub const DEFAULT_ADVERTISE_INTERVAL_SECS: u64 = 60;

// ============================================================================
// Provider Traits
// ============================================================================

/// Read-only configuration consumed by the advertisement transport
pub trait ConfigProvider: Send + Sync {
    /// Base data URL advertised by origins
    fn origin_url(&self) -> String;

    /// Base data URL advertised by caches
    fn cache_url(&self) -> String;

    /// Externally reachable web URL of this process
    fn external_web_url(&self) -> String;

    /// Version string sent in the `User-Agent` header
    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    /// Base data URL for a server role
    fn data_url_for(&self, server_type: ServerType) -> String {
        match server_type {
            ServerType::Cache => self.cache_url(),
            ServerType::Origin => self.origin_url(),
        }
    }
}

/// Resolves the name a server advertises itself under
#[async_trait]
pub trait ServiceNameResolver: Send + Sync {
    async fn service_name(&self, server_type: ServerType) -> anyhow::Result<String>;
}

/// Uses `server.sitename`, falling back to the host of the external web URL
#[derive(Debug, Clone)]
pub struct ConfiguredServiceName {
    sitename: Option<String>,
    external_web_url: String,
}

impl ConfiguredServiceName {
    pub fn new(sitename: Option<String>, external_web_url: impl Into<String>) -> Self {
        Self {
            sitename,
            external_web_url: external_web_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.server.sitename.clone(),
            config.server.external_web_url.clone(),
        )
    }
}

#[async_trait]
impl ServiceNameResolver for ConfiguredServiceName {
    async fn service_name(&self, server_type: ServerType) -> anyhow::Result<String> {
        if let Some(name) = self.sitename.as_deref().filter(|n| !n.trim().is_empty()) {
            return Ok(name.trim().to_string());
        }

        if self.external_web_url.is_empty() {
            anyhow::bail!(
                "cannot name the {server_type}: neither server.sitename nor server.external_web_url is set"
            );
        }

        let url = url::Url::parse(&self.external_web_url)
            .with_context(|| format!("invalid external web URL: {}", self.external_web_url))?;

        url.host_str()
            .map(str::to_string)
            .with_context(|| format!("external web URL has no host: {}", self.external_web_url))
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// This process' identity and status endpoint
    pub server: ServerConfig,

    /// Origin-specific settings
    pub origin: OriginConfig,

    /// Cache-specific settings
    pub cache: CacheConfig,

    /// Where the director lives
    pub federation: FederationConfig,

    /// Advertisement loop settings
    pub advertise: AdvertiseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Servers to advertise
    pub servers: Vec<ManagedServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub external_web_url: String,
    pub sitename: Option<String>,
    /// Bind address of the health status endpoint
    pub status_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            external_web_url: String::new(),
            sitename: None,
            status_address: SocketAddr::from(([0, 0, 0, 0], 8444)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Director endpoint; takes precedence over discovery
    pub director_url: Option<String>,

    /// Federation root serving `/.well-known/pelican-configuration`
    pub discovery_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvertiseConfig {
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
    /// Literal bearer token
    pub token: Option<String>,
    /// File re-read on every attempt
    pub token_file: Option<PathBuf>,
}

impl Default for AdvertiseConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_ADVERTISE_INTERVAL_SECS,
            request_timeout_secs: 30,
            token: None,
            token_file: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// One `[[servers]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedServerConfig {
    #[serde(rename = "type")]
    pub server_type: ServerType,
    #[serde(default)]
    pub namespaces: Vec<NamespaceAd>,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from an optional file, apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override settings from `PELICAN_*` environment variables
    pub fn apply_env(&mut self) {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        }

        if let Some(v) = var("PELICAN_ORIGIN_URL") {
            self.origin.url = v;
        }
        if let Some(v) = var("PELICAN_CACHE_URL") {
            self.cache.url = v;
        }
        if let Some(v) = var("PELICAN_SERVER_EXTERNALWEBURL") {
            self.server.external_web_url = v;
        }
        if let Some(v) = var("PELICAN_SERVER_SITENAME") {
            self.server.sitename = Some(v);
        }
        if let Some(v) = var("PELICAN_FEDERATION_DIRECTORURL") {
            self.federation.director_url = Some(v);
        }
        if let Some(v) = var("PELICAN_FEDERATION_DISCOVERYURL") {
            self.federation.discovery_url = Some(v);
        }
        if let Some(v) = var("PELICAN_ADVERTISE_TOKENFILE") {
            self.advertise.token_file = Some(PathBuf::from(v));
        }
        if let Some(v) = var("PELICAN_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = var("PELICAN_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.advertise.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "advertise.interval_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.advertise.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "advertise.request_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "logging.format".to_string(),
                reason: format!("unknown format '{}', expected text or json", self.logging.format),
            });
        }

        for server in &self.servers {
            if self.data_url_for(server.server_type).is_empty() {
                let field = match server.server_type {
                    ServerType::Origin => "origin.url",
                    ServerType::Cache => "cache.url",
                };
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get advertisement interval as Duration
    #[must_use]
    pub fn advertise_interval(&self) -> Duration {
        Duration::from_secs(self.advertise.interval_secs)
    }

    /// Get per-request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.advertise.request_timeout_secs)
    }

    /// Instantiate the configured servers
    pub fn build_servers(&self) -> Vec<Arc<dyn ManagedServer>> {
        self.servers
            .iter()
            .map(|s| {
                Arc::new(ConfiguredServer::new(s.server_type, s.namespaces.clone()))
                    as Arc<dyn ManagedServer>
            })
            .collect()
    }
}

impl ConfigProvider for Config {
    fn origin_url(&self) -> String {
        self.origin.url.clone()
    }

    fn cache_url(&self) -> String {
        self.cache.url.clone()
    }

    fn external_web_url(&self) -> String {
        self.server.external_web_url.clone()
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}
