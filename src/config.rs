//! Exporter configuration.
//!
//! Sources are merged in this order (later sources override earlier):
//! 1. Built-in defaults from `AppConfig::default()`
//! 2. TOML file (`--config`, or `ccm-exporter.toml` in the working directory)
//! 3. Environment variables, e.g. `CCM_EXPORTER_SERVER__PORT=9100`

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_PREFIX: &str = "CCM_EXPORTER_";
pub const DEFAULT_CONFIG_FILENAME: &str = "ccm-exporter.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub targets: Vec<OriginTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for one collection pass when the scraper sends no timeout header.
    pub scrape_timeout_secs: u64,
    /// Hard cap applied to every HTTP request.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8710,
            scrape_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    /// Sorted-set key prefix; one set per origin at `{key_prefix}:{origin}`.
    pub key_prefix: String,
    /// Width of the query window ending at the scrape instant.
    pub lookback_secs: i64,
    /// Per-operation bound for connect, ping and query.
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/".into(),
            key_prefix: "ccmsensor:mtr".into(),
            lookback_secs: 180,
            timeout_ms: 2_000,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, a daily rolling log file is written here as well.
    pub directory: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            directory: None,
            json: false,
        }
    }
}

/// One monitored origin and the probe sources read from its documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginTarget {
    pub origin: String,
    pub probes: Vec<ProbeTarget>,
}

/// A probe source key inside `sensorData`, plus the labels injected into
/// every measurement decoded from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeTarget {
    pub source: String,
    pub gateway: String,
    pub target_url: String,
}

impl Default for OriginTarget {
    fn default() -> Self {
        Self {
            origin: "Hong Kong UBISOFT".into(),
            probes: vec![ProbeTarget {
                source: "amazon".into(),
                gateway: "Amazon".into(),
                target_url: "useast1-public-ubiservices.ubi.com".into(),
            }],
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional TOML file and the environment.
    ///
    /// An explicit `path` must exist. Without one, `ccm-exporter.toml` in the
    /// working directory is merged when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::with_default_targets()));

        match path {
            Some(p) if p.exists() => figment = figment.merge(Toml::file(p)),
            Some(p) => return Err(ConfigError::NotFound(p.to_path_buf())),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILENAME);
                if fallback.exists() {
                    figment = figment.merge(Toml::file(fallback));
                }
            }
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus the single origin the exporter has always watched.
    pub fn with_default_targets() -> Self {
        Self {
            targets: vec![OriginTarget::default()],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.server.port == 0 {
            return invalid("server.port must be non-zero");
        }
        if self.server.scrape_timeout_secs == 0 || self.server.request_timeout_secs == 0 {
            return invalid("server timeouts must be non-zero");
        }
        if self.store.lookback_secs <= 0 {
            return invalid("store.lookback_secs must be positive");
        }
        if self.store.timeout_ms == 0 {
            return invalid("store.timeout_ms must be non-zero");
        }
        if self.targets.is_empty() {
            return invalid("at least one target origin is required");
        }
        for target in &self.targets {
            if target.origin.trim().is_empty() {
                return invalid("target origin must not be blank");
            }
            for probe in &target.probes {
                if probe.source.trim().is_empty() || probe.gateway.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "probe under origin \"{}\" needs a source and a gateway",
                        target.origin
                    )));
                }
            }
        }
        Ok(())
    }
}
