//! Node configuration.
//!
//! Layered: built-in defaults, then an optional YAML file, then environment
//! variables prefixed `CONTENT_NODE__` (e.g. `CONTENT_NODE__SERVER__PORT`).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/content_node.yaml";
pub const ENV_PREFIX: &str = "CONTENT_NODE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub land_registry: LandRegistryConfig,
    pub ethereum: EthereumConfig,
    pub limits: LimitsConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Local,
    S3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Prefix of the locators handed out by `GET /contents/:cid`. The
    /// default points at this node's own `GET /blobs/:cid`.
    pub public_url: String,
    pub local_dir: PathBuf,
    pub s3_bucket: String,
    /// Custom endpoint for S3-compatible services
    pub s3_endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Memory,
            public_url: "http://localhost:8080/blobs".to_string(),
            local_dir: PathBuf::from("data/contents"),
            s3_bucket: String::new(),
            s3_endpoint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandRegistryConfig {
    pub url: String,
    pub timeout_seconds: u64,
}

impl Default for LandRegistryConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl LandRegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthereumConfig {
    /// JSON-RPC endpoint for smart-account checks; disabled when unset
    pub rpc_url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            timeout_seconds: 10,
        }
    }
}

impl EthereumConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub parcel_size_limit: u64,
    pub request_ttl_seconds: i64,
    pub max_upload_bytes: usize,
    pub max_mapping_parcels: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            parcel_size_limit: 15 * 1024 * 1024,
            request_ttl_seconds: 600,
            max_upload_bytes: 200 * 1024 * 1024,
            max_mapping_parcels: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load from `path` (skipped when missing) and the environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("reading configuration from {}", path.display()))?;

        let config: Config = settings
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limits.parcel_size_limit == 0 {
            bail!("limits.parcel_size_limit must be positive");
        }
        if self.limits.request_ttl_seconds <= 0 {
            bail!("limits.request_ttl_seconds must be positive");
        }
        if self.limits.max_mapping_parcels == 0 {
            bail!("limits.max_mapping_parcels must be positive");
        }
        if self.land_registry.url.is_empty() {
            bail!("land_registry.url is required");
        }
        if self.storage.kind == StorageKind::S3 && self.storage.s3_bucket.is_empty() {
            bail!("storage.s3_bucket is required for s3 storage");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
