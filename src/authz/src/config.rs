//! Engine configuration loading and validation

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Decision engine configuration
///
/// ```toml
/// enable_cache = true
/// enable_metrics = true
/// log_level = "debug"
///
/// [cache]
/// capacity = 5000
/// ttl_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Put a read-through cache in front of the store
    ///
    /// Callers enabling this must invalidate it on role, grant and ACL
    /// mutation; stale entries change authorization outcomes.
    #[serde(default)]
    pub enable_cache: bool,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Enable metrics collection
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_cache: false,
            cache: CacheConfig::default(),
            enable_metrics: true,
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)
            .map_err(|e| AuthzError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.enable_cache {
            self.cache.validate()?;
        }

        if self.log_level.trim().is_empty() {
            return Err(AuthzError::Config("log_level must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Read-through cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries per cached table
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Time-to-live for cached reads, in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    /// Time-to-live as a duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(AuthzError::Config("cache.capacity must be greater than 0".to_string()));
        }
        if self.ttl_secs == 0 {
            return Err(AuthzError::Config("cache.ttl_secs must be greater than 0".to_string()));
        }
        Ok(())
    }
}

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_capacity() -> usize { 10_000 }
fn default_ttl_secs() -> u64 { 60 }
