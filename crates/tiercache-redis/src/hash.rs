//! The `hash` remote layout: one Redis hash per region.
//!
//! Region `r` is the hash at `"<ns>:<r>"`, fields are the entry keys as
//! plain UTF-8 strings. Hash fields have no native expiry, so this layout
//! ignores TTLs; pick `generic` for regions that need them.

use std::time::Duration;

use deadpool_redis::Pool;
use redis::AsyncCommands;
use tiercache_core::{CacheError, Result, qualified_region};

#[derive(Clone)]
pub struct HashLayout {
    pool: Pool,
    namespace: String,
}

impl HashLayout {
    pub fn new(pool: Pool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    fn region_key(&self, region: &str) -> String {
        qualified_region(&self.namespace, region)
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("pool: {e}")))
    }

    pub async fn get(&self, region: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        conn.hget::<_, _, Option<Vec<u8>>>(self.region_key(region), key)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("HGET: {e}")))
    }

    pub async fn put(
        &self,
        region: &str,
        key: &str,
        bytes: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()> {
        if ttl.is_some_and(|d| !d.is_zero()) {
            tracing::debug!(region = %region, key = %key, "hash layout has no per-entry expiry, ttl ignored");
        }
        let mut conn = self.conn().await?;
        conn.hset::<_, _, _, ()>(self.region_key(region), key, bytes)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("HSET: {e}")))
    }

    pub async fn evict(&self, region: &str, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        conn.hdel::<_, _, ()>(self.region_key(region), keys.to_vec())
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("HDEL: {e}")))
    }

    pub async fn clear(&self, region: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(self.region_key(region))
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("DEL: {e}")))
    }

    pub async fn keys(&self, region: &str) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        conn.hkeys::<_, Vec<String>>(self.region_key(region))
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("HKEYS: {e}")))
    }

    pub async fn exists(&self, region: &str, key: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        conn.hexists::<_, _, bool>(self.region_key(region), key)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("HEXISTS: {e}")))
    }

    /// Conditionally insert; returns the pre-existing bytes when the field
    /// was already present.
    ///
    /// This is a check-then-set without a server-side conditional: two
    /// nodes racing the same absent field can both observe `None` and both
    /// write. Use the generic layout where that matters.
    pub async fn put_if_absent(
        &self,
        region: &str,
        key: &str,
        bytes: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        let region_key = self.region_key(region);
        let mut conn = self.conn().await?;
        let present: bool = conn
            .hexists(&region_key, key)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("HEXISTS: {e}")))?;
        if present {
            return conn
                .hget::<_, _, Option<Vec<u8>>>(&region_key, key)
                .await
                .map_err(|e| CacheError::l2_unavailable(format!("HGET: {e}")));
        }
        conn.hset::<_, _, _, ()>(&region_key, key, bytes)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("HSET: {e}")))?;
        Ok(None)
    }

    /// Atomic counter step on a hash field.
    pub async fn incr(&self, region: &str, key: &str, delta: i64) -> Result<i64> {
        let mut conn = self.conn().await?;
        conn.hincr::<_, _, _, i64>(self.region_key(region), key, delta)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("HINCRBY: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{RedisConfig, create_pool};

    fn layout(namespace: &str) -> HashLayout {
        HashLayout::new(create_pool(&RedisConfig::default()).unwrap(), namespace)
    }

    #[test]
    fn test_region_key_includes_namespace() {
        assert_eq!(layout("prod").region_key("users"), "prod:users");
        assert_eq!(layout("").region_key("users"), "users");
    }
}
