//! The remote-tier store: layout selection over one shared pool.

use std::time::Duration;

use deadpool_redis::Pool;
use serde::{Deserialize, Serialize};
use tiercache_core::Result;

use crate::generic::GenericLayout;
use crate::hash::HashLayout;

/// Which remote layout a deployment uses.
///
/// - `generic` — one key per entry; native per-entry TTL; enumeration by
///   server-side scan.
/// - `hash` — one hash per region; compact, but no per-entry TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum L2Layout {
    #[default]
    Generic,
    Hash,
}

/// Remote store over a pooled Redis client.
#[derive(Clone)]
pub enum RedisStore {
    Generic(GenericLayout),
    Hash(HashLayout),
}

impl RedisStore {
    pub fn new(pool: Pool, namespace: impl Into<String>, layout: L2Layout) -> Self {
        let namespace = namespace.into();
        match layout {
            L2Layout::Generic => Self::Generic(GenericLayout::new(pool, namespace)),
            L2Layout::Hash => Self::Hash(HashLayout::new(pool, namespace)),
        }
    }

    pub fn layout(&self) -> L2Layout {
        match self {
            Self::Generic(_) => L2Layout::Generic,
            Self::Hash(_) => L2Layout::Hash,
        }
    }

    /// Whether this layout honours per-entry TTLs.
    pub fn supports_ttl(&self) -> bool {
        matches!(self, Self::Generic(_))
    }

    pub async fn get(&self, region: &str, key: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Generic(l) => l.get(region, key).await,
            Self::Hash(l) => l.get(region, key).await,
        }
    }

    pub async fn put(
        &self,
        region: &str,
        key: &str,
        bytes: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()> {
        match self {
            Self::Generic(l) => l.put(region, key, bytes, ttl).await,
            Self::Hash(l) => l.put(region, key, bytes, ttl).await,
        }
    }

    pub async fn evict(&self, region: &str, keys: &[String]) -> Result<()> {
        match self {
            Self::Generic(l) => l.evict(region, keys).await,
            Self::Hash(l) => l.evict(region, keys).await,
        }
    }

    pub async fn clear(&self, region: &str) -> Result<()> {
        match self {
            Self::Generic(l) => l.clear(region).await,
            Self::Hash(l) => l.clear(region).await,
        }
    }

    pub async fn keys(&self, region: &str) -> Result<Vec<String>> {
        match self {
            Self::Generic(l) => l.keys(region).await,
            Self::Hash(l) => l.keys(region).await,
        }
    }

    pub async fn exists(&self, region: &str, key: &str) -> Result<bool> {
        match self {
            Self::Generic(l) => l.exists(region, key).await,
            Self::Hash(l) => l.exists(region, key).await,
        }
    }

    /// See the layout docs for the atomicity contract: native `SET NX` on
    /// `generic`, check-then-set on `hash`.
    pub async fn put_if_absent(
        &self,
        region: &str,
        key: &str,
        bytes: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Generic(l) => l.put_if_absent(region, key, bytes).await,
            Self::Hash(l) => l.put_if_absent(region, key, bytes).await,
        }
    }

    pub async fn incr(&self, region: &str, key: &str, delta: i64) -> Result<i64> {
        match self {
            Self::Generic(l) => l.incr(region, key, delta).await,
            Self::Hash(l) => l.incr(region, key, delta).await,
        }
    }

    /// Remaining per-entry TTL; always `None` on the hash layout.
    pub async fn ttl_remaining(&self, region: &str, key: &str) -> Result<Option<Duration>> {
        match self {
            Self::Generic(l) => l.ttl_remaining(region, key).await,
            Self::Hash(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_serde_kebab_case() {
        assert_eq!(serde_json::to_string(&L2Layout::Generic).unwrap(), "\"generic\"");
        assert_eq!(serde_json::to_string(&L2Layout::Hash).unwrap(), "\"hash\"");
        assert_eq!(
            serde_json::from_str::<L2Layout>("\"hash\"").unwrap(),
            L2Layout::Hash
        );
    }

    #[test]
    fn test_default_layout_is_generic() {
        assert_eq!(L2Layout::default(), L2Layout::Generic);
    }

    #[test]
    fn test_store_reports_layout() {
        let pool = crate::pool::create_pool(&crate::pool::RedisConfig::default()).unwrap();
        let store = RedisStore::new(pool.clone(), "ns", L2Layout::Generic);
        assert_eq!(store.layout(), L2Layout::Generic);
        assert!(store.supports_ttl());

        let store = RedisStore::new(pool, "ns", L2Layout::Hash);
        assert_eq!(store.layout(), L2Layout::Hash);
        assert!(!store.supports_ttl());
    }
}
