//! Gateway configuration.
//!
//! Configuration is read from a JSON file, then selected values can be
//! overridden from the environment:
//!
//! ```json
//! {
//!   "listen": "0.0.0.0:8080",
//!   "logLevel": "info",
//!   "store": {
//!     "backend": "memcached",
//!     "host": "localhost",
//!     "port": 11211,
//!     "buckets": ["default", {"name": "beer-sample", "port": 11212}],
//!     "operationTimeoutMs": 5000,
//!     "maxIdleConnections": 8,
//!     "maxValueBytes": 1048576
//!   }
//! }
//! ```
//!
//! Every field is optional. The `store` section may also be spelled
//! `couchbase`.
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `KVGATE_LISTEN` | `listen` |
//! | `LOG_LEVEL` | `logLevel` |
//! | `KVGATE_STORE_BACKEND` | `store.backend` |

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::store::memcached::DEFAULT_MAX_VALUE_BYTES;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("unable to find configuration file {0}")]
    NotFound(PathBuf),
    /// The configuration file could not be read.
    #[error("unable to read configuration file {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON for this schema.
    #[error("unable to parse configuration file {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// An override names an unknown backend.
    #[error("unknown store backend [{0}], expected memcached or memory")]
    InvalidBackend(String),
    /// The bucket list is empty.
    #[error("no buckets configured")]
    NoBuckets,
}

/// Which store implementation backs the buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Remote memcached-protocol endpoint.
    #[default]
    Memcached,
    /// In-process map, lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memcached" | "couchbase" => Ok(Self::Memcached),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidBackend(other.to_owned())),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memcached => f.write_str("memcached"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// A configured bucket: a bare name, or a name with its own endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BucketSpec {
    /// Bucket served by the store's default endpoint.
    Name(String),
    /// Bucket with endpoint overrides.
    Detailed {
        /// Bucket name.
        name: String,
        /// Host override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host: Option<String>,
        /// Port override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<u16>,
    },
}

impl BucketSpec {
    /// Bucket name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { name, .. } => name,
        }
    }

    /// `host:port` of the endpoint serving this bucket.
    #[must_use]
    pub fn addr(&self, store: &StoreConfig) -> String {
        match self {
            Self::Name(_) => format!("{}:{}", store.host, store.port),
            Self::Detailed { host, port, .. } => format!(
                "{}:{}",
                host.as_deref().unwrap_or(&store.host),
                port.unwrap_or(store.port)
            ),
        }
    }
}

/// Store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Store implementation.
    #[builder(default)]
    pub backend: StoreBackend,

    /// Store host.
    #[builder(default = String::from("localhost"))]
    pub host: String,

    /// Store port.
    #[builder(default = 11211)]
    pub port: u16,

    /// Buckets to expose.
    #[builder(default = vec![BucketSpec::Name(String::from("default"))])]
    pub buckets: Vec<BucketSpec>,

    /// Upper bound on a single store round trip, in milliseconds.
    #[builder(default = 5000)]
    pub operation_timeout_ms: u64,

    /// Idle connections kept per bucket.
    #[builder(default = 8)]
    pub max_idle_connections: usize,

    /// Largest document the store may return, in bytes.
    #[builder(default = DEFAULT_MAX_VALUE_BYTES)]
    pub max_value_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl StoreConfig {
    /// Store round-trip timeout.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Top-level gateway configuration.
///
/// # Examples
///
/// ```
/// use kvgate_core::config::{GatewayConfig, StoreBackend};
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.listen, "0.0.0.0:8080");
/// assert_eq!(config.store.backend, StoreBackend::Memcached);
/// assert_eq!(config.store.buckets[0].name(), "default");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    /// Bind address of the HTTP listener.
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub listen: String,

    /// Log level filter (e.g. `"info"`, `"kvgate_http=debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Store settings.
    #[serde(alias = "couchbase")]
    #[builder(default)]
    pub store: StoreConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GatewayConfig {
    /// Default configuration file, relative to the working directory.
    pub const DEFAULT_PATH: &'static str = "./kvgate.json";

    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_owned()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`.
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("KVGATE_LISTEN") {
            self.listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = lookup("KVGATE_STORE_BACKEND") {
            self.store.backend = v.parse()?;
        }
        Ok(self)
    }

    /// Reject configurations the gateway cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.buckets.is_empty() {
            return Err(ConfigError::NoBuckets);
        }
        Ok(())
    }
}
