//! The `generic` remote layout: one Redis key per entry.
//!
//! Entry `k` of region `r` lives at `"<ns>:<r>:<k>"`. Per-entry TTL is
//! native (`SETEX`), conditional insert is native (`SET NX`), and region
//! enumeration is a non-blocking cursor `SCAN` over `"<ns>:<r>:*"`.

use std::time::Duration;

use deadpool_redis::Pool;
use redis::AsyncCommands;
use tiercache_core::{CacheError, Result, qualified_region};

#[derive(Clone)]
pub struct GenericLayout {
    pool: Pool,
    namespace: String,
}

impl GenericLayout {
    pub fn new(pool: Pool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    fn region_prefix(&self, region: &str) -> String {
        format!("{}:", qualified_region(&self.namespace, region))
    }

    fn entry_key(&self, region: &str, key: &str) -> String {
        format!("{}{key}", self.region_prefix(region))
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("pool: {e}")))
    }

    pub async fn get(&self, region: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<Vec<u8>>>(self.entry_key(region, key))
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("GET: {e}")))
    }

    pub async fn put(
        &self,
        region: &str,
        key: &str,
        bytes: &[u8],
        ttl: Option<Duration>,
    ) -> Result<()> {
        let mut conn = self.conn().await?;
        let entry_key = self.entry_key(region, key);
        match ttl.filter(|d| !d.is_zero()) {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(entry_key, bytes, ttl.as_secs().max(1))
                .await
                .map_err(|e| CacheError::l2_unavailable(format!("SETEX: {e}"))),
            None => conn
                .set::<_, _, ()>(entry_key, bytes)
                .await
                .map_err(|e| CacheError::l2_unavailable(format!("SET: {e}"))),
        }
    }

    pub async fn evict(&self, region: &str, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let full: Vec<String> = keys.iter().map(|k| self.entry_key(region, k)).collect();
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(full)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("DEL: {e}")))
    }

    pub async fn clear(&self, region: &str) -> Result<()> {
        let entry_keys = self.scan_region(region).await?;
        if entry_keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(entry_keys)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("DEL: {e}")))
    }

    pub async fn keys(&self, region: &str) -> Result<Vec<String>> {
        let prefix = self.region_prefix(region);
        Ok(self
            .scan_region(region)
            .await?
            .into_iter()
            .filter_map(|full| full.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    pub async fn exists(&self, region: &str, key: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        conn.exists::<_, bool>(self.entry_key(region, key))
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("EXISTS: {e}")))
    }

    /// Conditionally insert; returns the pre-existing bytes when the key
    /// was already present. The insert itself is atomic (`SET NX`).
    pub async fn put_if_absent(
        &self,
        region: &str,
        key: &str,
        bytes: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        let entry_key = self.entry_key(region, key);
        let inserted: bool = conn
            .set_nx(&entry_key, bytes)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("SETNX: {e}")))?;
        if inserted {
            return Ok(None);
        }
        conn.get::<_, Option<Vec<u8>>>(&entry_key)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("GET: {e}")))
    }

    /// Atomic counter step. Operates on the raw integer representation
    /// Redis keeps for `INCRBY`; not interchangeable with codec-framed
    /// values on the same key.
    pub async fn incr(&self, region: &str, key: &str, delta: i64) -> Result<i64> {
        let mut conn = self.conn().await?;
        conn.incr::<_, _, i64>(self.entry_key(region, key), delta)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("INCRBY: {e}")))
    }

    /// Remaining TTL for an entry, `None` when absent or persistent.
    pub async fn ttl_remaining(&self, region: &str, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn().await?;
        let millis: i64 = conn
            .pttl(self.entry_key(region, key))
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("PTTL: {e}")))?;
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }

    async fn scan_region(&self, region: &str) -> Result<Vec<String>> {
        let pattern = format!("{}*", self.region_prefix(region));
        let mut conn = self.conn().await?;
        let mut found = Vec::new();
        let mut iter = conn
            .scan_match::<_, String>(pattern)
            .await
            .map_err(|e| CacheError::l2_unavailable(format!("SCAN: {e}")))?;
        while let Some(entry_key) = iter.next_item().await {
            found.push(entry_key);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{RedisConfig, create_pool};

    fn layout(namespace: &str) -> GenericLayout {
        GenericLayout::new(create_pool(&RedisConfig::default()).unwrap(), namespace)
    }

    #[test]
    fn test_entry_key_includes_namespace() {
        let l = layout("prod");
        assert_eq!(l.entry_key("users", "u1"), "prod:users:u1");
    }

    #[test]
    fn test_entry_key_without_namespace() {
        let l = layout("");
        assert_eq!(l.entry_key("users", "u1"), "users:u1");
    }

    #[test]
    fn test_region_prefix_ends_with_separator() {
        let l = layout("prod");
        assert_eq!(l.region_prefix("users"), "prod:users:");
    }
}
