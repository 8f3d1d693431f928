//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_KEY_PREFIX: &str = "koktail";
const DEFAULT_LANDING_TTL_SECS: u64 = 3600;
const DEFAULT_MEMORY_CAPACITY: usize = 64;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 250;

/// Which store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Memory,
    Redis,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: BackendKind,
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub landing_ttl: Duration,
    pub memory_capacity: usize,
    pub operation_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: BackendKind::Memory,
            redis_url: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            landing_ttl: Duration::from_secs(DEFAULT_LANDING_TTL_SECS),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            key_prefix: settings.key_prefix.clone(),
            landing_ttl: settings.landing_ttl,
            memory_capacity: settings.memory_capacity.get(),
            operation_timeout: settings.operation_timeout,
        }
    }
}

impl CacheConfig {
    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.landing_ttl, Duration::from_secs(3600));
        assert_eq!(config.memory_capacity, 64);
        assert_eq!(config.key_prefix, "koktail");
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            memory_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.memory_capacity_non_zero().get(), 1);
    }
}
