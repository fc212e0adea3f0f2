//! Engine configuration
//!
//! Defaults suit a single service instance. Every field can be overridden
//! from the environment at boot:
//!
//! - `AUTHZ_CACHE_ENABLED` - closure cache on/off (default: true)
//! - `AUTHZ_CACHE_SIZE` - closure cache capacity (default: 10000)
//! - `AUTHZ_CACHE_TTL_SECS` - closure cache TTL in seconds (default: 60)
//! - `AUTHZ_METRICS_ENABLED` - decision counters on/off (default: true)

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, Result};

/// Closure cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable closure memoization
    pub enabled: bool,

    /// Maximum number of entries in the cache
    pub capacity: usize,

    /// Time-to-live for cached closures
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 10_000,
            ttl: Duration::from_secs(60),
        }
    }
}

/// Scope engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Role closure cache
    pub closure_cache: CacheConfig,

    /// Enable decision counters
    pub enable_metrics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            closure_cache: CacheConfig::default(),
            enable_metrics: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Unset keys keep their default; set but unparsable keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(enabled) = parse_var(&lookup, "AUTHZ_CACHE_ENABLED")? {
            config.closure_cache.enabled = enabled;
        }
        if let Some(capacity) = parse_var(&lookup, "AUTHZ_CACHE_SIZE")? {
            config.closure_cache.capacity = capacity;
        }
        if let Some(secs) = parse_var(&lookup, "AUTHZ_CACHE_TTL_SECS")? {
            config.closure_cache.ttl = Duration::from_secs(secs);
        }
        if let Some(enabled) = parse_var(&lookup, "AUTHZ_METRICS_ENABLED")? {
            config.enable_metrics = enabled;
        }

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AuthzError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(ttl.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
