//! Connection pool construction.
//!
//! The rest of the crate only ever sees a [`Pool`]; acquisition through
//! `Pool::get()` is the scoped borrow — the wrapped connection returns to
//! the pool when it drops, on success, error, and panic paths alike.

use std::time::Duration;

use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use serde::{Deserialize, Serialize};
use tiercache_core::{CacheError, Result};

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection URL: `redis://[:password@]host:port[/db]`
    #[serde(default = "default_url")]
    pub url: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Timeout for creating and waiting on a pooled connection.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".into()
}
fn default_pool_size() -> usize {
    8
}
fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            pool_size: default_pool_size(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Build a connection pool from the config.
///
/// Connections are created lazily; an unreachable server surfaces on the
/// first `get()`, not here.
pub fn create_pool(config: &RedisConfig) -> Result<Pool> {
    let mut cfg = Config::from_url(&config.url);

    let timeout = Duration::from_millis(config.connect_timeout_ms);
    let mut pool_cfg = PoolConfig::new(config.pool_size);
    pool_cfg.timeouts.wait = Some(timeout);
    pool_cfg.timeouts.create = Some(timeout);
    cfg.pool = Some(pool_cfg);

    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| CacheError::configuration(format!("failed to create redis pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://127.0.0.1:6379");
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.connect_timeout_ms, 5000);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: RedisConfig =
            serde_json::from_str(r#"{"url":"redis://cache:6379"}"#).unwrap();
        assert_eq!(config.url, "redis://cache:6379");
        assert_eq!(config.pool_size, 8);
    }

    #[test]
    fn test_create_pool_is_lazy() {
        // No server is listening here; pool creation still succeeds.
        let config = RedisConfig {
            url: "redis://127.0.0.1:1".into(),
            ..RedisConfig::default()
        };
        assert!(create_pool(&config).is_ok());
    }

    #[test]
    fn test_create_pool_rejects_bad_url() {
        let config = RedisConfig {
            url: "not-a-url".into(),
            ..RedisConfig::default()
        };
        assert!(create_pool(&config).is_err());
    }
}
