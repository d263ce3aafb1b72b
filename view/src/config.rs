//! Configuration for the view coordinator.

use crate::coordinator::SharedCache;
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tabula_core::{Anchor, InsertPosition, RecordCache};

/// Coordinator configuration, overridable from environment variables.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound on any single gateway call; elapsing is treated exactly
    /// like a gateway failure
    pub gateway_timeout: Duration,
    /// Optional freshness window for cache entries
    pub cache_ttl: Option<Duration>,
    /// Where the active draft is displayed
    pub anchor: Anchor,
    /// Where a newly committed create lands in its cache entry
    pub insert_position: InsertPosition,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: Duration::from_secs(10),
            cache_ttl: None,
            anchor: Anchor::Start,
            insert_position: InsertPosition::Start,
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration, applying `TABULA_GATEWAY_TIMEOUT_MS` and
    /// `TABULA_CACHE_TTL_MS` overrides when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("TABULA_GATEWAY_TIMEOUT_MS") {
            let ms: u64 = raw.parse().map_err(|_| ConfigError::InvalidTimeout)?;
            config.gateway_timeout = Duration::from_millis(ms);
        }
        if let Ok(raw) = env::var("TABULA_CACHE_TTL_MS") {
            let ms: u64 = raw.parse().map_err(|_| ConfigError::InvalidTtl)?;
            config.cache_ttl = Some(Duration::from_millis(ms));
        }

        Ok(config)
    }

    /// Create the cache handle coordinators share, honoring `cache_ttl`.
    /// Build it once and clone the handle into every coordinator reading
    /// the same backend.
    pub fn new_shared_cache(&self) -> SharedCache {
        let cache = match self.cache_ttl {
            Some(ttl) => RecordCache::with_ttl(ttl.as_millis() as u64),
            None => RecordCache::new(),
        };
        Arc::new(Mutex::new(cache))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TABULA_GATEWAY_TIMEOUT_MS value")]
    InvalidTimeout,

    #[error("Invalid TABULA_CACHE_TTL_MS value")]
    InvalidTtl,
}
