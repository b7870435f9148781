//! Client configuration.
//!
//! Loaded from TOML; every section and field is optional and falls back to
//! its default.
//!
//! ```toml
//! [connection]
//! host = "10.0.0.5"
//! port = 6380
//!
//! [pool]
//! max_size = 4
//!
//! [scan]
//! default_count = 500
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::connection::ConnectionConfig;
use crate::error::{Error, Result};
use crate::pool::PoolConfig;

/// Defaults applied to every scan started through a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// `COUNT` hint used when a scan's options do not set one.
    pub default_count: Option<u64>,
}

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address and I/O settings.
    pub connection: ConnectionConfig,
    /// Connection checkout limits.
    pub pool: PoolConfig,
    /// Scan defaults.
    pub scan: ScanConfig,
}

impl ClientConfig {
    /// Read and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))
    }

    /// Reject values the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.connection.host.trim().is_empty() {
            return Err(Error::Config("connection.host must not be empty".into()));
        }
        if self.pool.max_size == 0 {
            return Err(Error::Config("pool.max_size must be at least 1".into()));
        }
        if self.scan.default_count == Some(0) {
            return Err(Error::Config("scan.default_count must be positive".into()));
        }
        Ok(())
    }
}
