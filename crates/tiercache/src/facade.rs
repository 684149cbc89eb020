//! Thin public façade over the manager.
//!
//! Accepts keys of arbitrary scalar type and coerces them to strings
//! deterministically (integers base 10, booleans `true`/`false`, byte
//! slices base64) before forwarding. Carries no coherence logic of its
//! own.

use std::sync::Arc;
use std::time::Duration;

use tiercache_core::{IntoCacheKey, Result, Value};

use crate::loader::CacheLoader;
use crate::manager::{CacheManager, RegionInfo};

#[derive(Clone)]
pub struct Cache {
    manager: Arc<CacheManager>,
}

impl Cache {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    /// The manager behind this façade.
    pub fn manager(&self) -> &Arc<CacheManager> {
        &self.manager
    }

    pub async fn get(&self, region: &str, key: impl IntoCacheKey) -> Result<Option<Arc<Value>>> {
        self.manager.get(region, &key.into_cache_key()).await
    }

    pub async fn get_or_load(
        &self,
        region: &str,
        key: impl IntoCacheKey,
        loader: &dyn CacheLoader,
    ) -> Result<Arc<Value>> {
        self.manager
            .get_or_load(region, &key.into_cache_key(), loader)
            .await
    }

    pub async fn put(
        &self,
        region: &str,
        key: impl IntoCacheKey,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.manager
            .put(region, &key.into_cache_key(), value.into())
            .await
    }

    pub async fn put_with_ttl(
        &self,
        region: &str,
        key: impl IntoCacheKey,
        value: impl Into<Value>,
        ttl: Duration,
    ) -> Result<()> {
        self.manager
            .put_with_ttl(region, &key.into_cache_key(), value.into(), ttl)
            .await
    }

    pub async fn evict(&self, region: &str, key: impl IntoCacheKey) -> Result<()> {
        self.manager
            .evict(region, vec![key.into_cache_key()])
            .await
    }

    pub async fn evict_all(&self, region: &str, keys: Vec<String>) -> Result<()> {
        self.manager.evict(region, keys).await
    }

    pub async fn clear(&self, region: &str) -> Result<()> {
        self.manager.clear(region).await
    }

    pub async fn exists(&self, region: &str, key: impl IntoCacheKey) -> Result<bool> {
        self.manager.exists(region, &key.into_cache_key()).await
    }

    pub async fn put_if_absent(
        &self,
        region: &str,
        key: impl IntoCacheKey,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        self.manager
            .put_if_absent(region, &key.into_cache_key(), value.into())
            .await
    }

    pub async fn incr(&self, region: &str, key: impl IntoCacheKey, delta: i64) -> Result<i64> {
        self.manager.incr(region, &key.into_cache_key(), delta).await
    }

    pub async fn decr(&self, region: &str, key: impl IntoCacheKey, delta: i64) -> Result<i64> {
        self.manager.decr(region, &key.into_cache_key(), delta).await
    }

    pub async fn keys(&self, region: &str) -> Result<Vec<String>> {
        self.manager.keys(region).await
    }

    pub async fn regions(&self) -> Result<Vec<RegionInfo>> {
        self.manager.regions().await
    }

    // Typed getters for callers that know the shape they stored.

    pub async fn get_string(&self, region: &str, key: impl IntoCacheKey) -> Result<Option<String>> {
        Ok(self
            .get(region, key)
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    pub async fn get_i64(&self, region: &str, key: impl IntoCacheKey) -> Result<Option<i64>> {
        Ok(self.get(region, key).await?.and_then(|v| v.as_i64()))
    }

    pub async fn get_bool(&self, region: &str, key: impl IntoCacheKey) -> Result<Option<bool>> {
        Ok(self.get(region, key).await?.and_then(|v| v.as_bool()))
    }

    pub async fn get_f64(&self, region: &str, key: impl IntoCacheKey) -> Result<Option<f64>> {
        Ok(self.get(region, key).await?.and_then(|v| v.as_f64()))
    }

    pub async fn get_bytes(&self, region: &str, key: impl IntoCacheKey) -> Result<Option<Vec<u8>>> {
        Ok(self
            .get(region, key)
            .await?
            .and_then(|v| v.as_bytes().map(<[u8]>::to_vec)))
    }
}
