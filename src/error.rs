//! Error types shared by the store adapter, the collector and the config layer.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while talking to the measurement store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store url \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation `{op}` timed out after {elapsed:?}")]
    Timeout { op: &'static str, elapsed: Duration },

    #[error("store query failed: {0}")]
    Query(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
            Self::Unavailable(e.to_string())
        } else {
            Self::Query(e.to_string())
        }
    }
}

/// Errors that fail a whole collection pass.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid metric descriptor: {0}")]
    Descriptor(prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    Encode(prometheus::Error),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Load(Box::new(e))
    }
}
