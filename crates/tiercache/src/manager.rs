//! The cache manager: region registry, read-through/write-through logic,
//! and fan-out to the near cache, the remote tier, and the channel.
//!
//! ## Mutation ordering
//!
//! Every mutation applies **remote tier first, then near cache, then
//! publish**. A node that dies mid-mutation therefore leaves peers with a
//! monotonic view through the remote tier. A remote failure surfaces
//! before the near cache is touched; a publish failure is logged and the
//! operation still succeeds — the local node is authoritative for its own
//! near cache, and peers converge on the next write per key.
//!
//! ## Lifecycle
//!
//! Built once with [`CacheManager::init`], torn down with
//! [`CacheManager::shutdown`]; never lazily initialised. Shutdown flips a
//! flag (new operations fail fast), drains in-flight operations, publishes
//! a single QUIT, and stops the receiver and sweeper. It is idempotent.

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tiercache_core::{
    CacheError, Command, EvictionEvent, EvictionReason, Operation, RegionPolicy, Result, Value,
    codec, validate_key, validate_region_name,
};
use tiercache_memory::MemoryStore;
use tiercache_redis::{InvalidationChannel, RedisStore, create_pool};
use tokio::sync::{RwLock, RwLockReadGuard, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::CacheConfig;
use crate::loader::CacheLoader;

/// Snapshot of one live region.
#[derive(Debug, Clone)]
pub struct RegionInfo {
    pub name: String,
    pub len: usize,
    pub policy: RegionPolicy,
}

pub struct CacheManager {
    config: CacheConfig,
    l1: Arc<MemoryStore>,
    l2: RedisStore,
    channel: InvalidationChannel,
    /// Process-lifetime id used to suppress self-echo on the channel.
    sender_id: String,
    /// Peer ids learned from JOIN commands.
    peers: DashMap<String, ()>,
    /// Operations hold this in read mode; shutdown takes it in write mode
    /// to drain them.
    lifecycle: RwLock<()>,
    shutting_down: AtomicBool,
    receiver: StdMutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("config", &self.config)
            .field("sender_id", &self.sender_id)
            .field("shutting_down", &self.shutting_down)
            .finish_non_exhaustive()
    }
}

impl CacheManager {
    /// Build the broker, start the channel receiver and the expiry
    /// sweeper, and announce this node with a JOIN.
    pub async fn init(config: CacheConfig) -> Result<Arc<Self>> {
        config.validate().map_err(CacheError::configuration)?;

        let pool = create_pool(&config.redis)?;
        let l2 = RedisStore::new(pool.clone(), config.namespace.clone(), config.storage);
        let channel =
            InvalidationChannel::new(pool, config.redis.url.clone(), config.channel.clone());
        let l1 = Arc::new(MemoryStore::new(
            config.regions.clone(),
            config.default_region,
        ));
        let sender_id = uuid::Uuid::new_v4().to_string();

        let manager = Arc::new(Self {
            l1,
            l2,
            channel,
            sender_id,
            peers: DashMap::new(),
            lifecycle: RwLock::new(()),
            shutting_down: AtomicBool::new(false),
            receiver: StdMutex::new(None),
            config,
        });

        let weak = Arc::downgrade(&manager);
        let handle = manager.channel.subscribe(Arc::new(move |command| {
            if let Some(manager) = weak.upgrade() {
                manager.apply_command(command);
            }
        }));
        *manager.receiver.lock().expect("receiver lock") = Some(handle);

        manager
            .l1
            .start_sweeper(Duration::from_secs(manager.config.sweep_interval_secs));

        if let Err(e) = manager
            .channel
            .publish(&Command::join(&manager.sender_id))
            .await
        {
            warn!(error = %e, "could not announce JOIN, peers will learn this node from its first write");
        }

        info!(
            sender_id = %manager.sender_id,
            layout = ?manager.config.storage,
            namespace = %manager.config.namespace,
            "cache manager started"
        );
        Ok(manager)
    }

    /// This node's channel sender id.
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// Peer sender ids currently known from JOIN/QUIT traffic.
    pub fn peers(&self) -> Vec<String> {
        self.peers.iter().map(|e| e.key().clone()).collect()
    }

    /// Subscribe to near-cache eviction events (the eviction-listener
    /// capability). Events carry the region, key, and reason.
    pub fn subscribe_evictions(&self) -> broadcast::Receiver<EvictionEvent> {
        self.l1.eviction_bus().subscribe()
    }

    /// Near-cache-only probe: no remote lookup, no loader, no publish.
    /// Diagnostic surface for tests and monitoring.
    pub fn peek_l1(&self, region: &str, key: &str) -> Option<Arc<Value>> {
        self.l1.existing(region).and_then(|r| r.get(key))
    }

    async fn begin_op(&self) -> Result<RwLockReadGuard<'_, ()>> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(CacheError::ShuttingDown);
        }
        Ok(self.lifecycle.read().await)
    }

    fn l2_ttl(&self, region: &str) -> Option<Duration> {
        let secs = self.config.policy_for(region).l2_ttl_secs;
        (secs > 0).then(|| Duration::from_secs(secs))
    }

    /// Log-and-swallow publish: the local mutation already succeeded and
    /// the local node is authoritative for its own near cache.
    async fn publish(&self, command: Command) {
        if let Err(e) = self.channel.publish(&command).await {
            warn!(
                error = %e,
                op = ?command.op,
                region = %command.region,
                "invalidation publish failed; peer near caches stay stale until the next write"
            );
        }
    }

    /// Read a value: near cache, then remote tier (promoting hits into the
    /// near cache). Never invokes a loader and never publishes.
    pub async fn get(&self, region: &str, key: &str) -> Result<Option<Arc<Value>>> {
        let _op = self.begin_op().await?;
        validate_region_name(region)?;
        validate_key(key)?;
        self.get_inner(region, key).await
    }

    async fn get_inner(&self, region: &str, key: &str) -> Result<Option<Arc<Value>>> {
        let near = self.l1.region(region);
        if let Some(value) = near.get(key) {
            trace!(region = %region, key = %key, "near-cache hit");
            return Ok(Some(value));
        }

        match self.l2.get(region, key).await {
            Ok(Some(bytes)) => match codec::decode(&bytes) {
                Ok(value) => {
                    debug!(region = %region, key = %key, "remote hit, promoting");
                    let value = Arc::new(value);
                    near.put(key, Arc::clone(&value), None);
                    Ok(Some(value))
                }
                Err(e) => {
                    warn!(region = %region, key = %key, error = %e, "evicting undecodable remote entry");
                    if let Err(e) = self.l2.evict(region, &[key.to_string()]).await {
                        warn!(region = %region, key = %key, error = %e, "could not evict poisoned entry");
                    }
                    Ok(None)
                }
            },
            Ok(None) => Ok(None),
            Err(e) => {
                // Availability over freshness: a remote outage turns reads
                // into misses, it does not fail them.
                warn!(region = %region, key = %key, error = %e, "remote read failed, degrading to miss");
                Ok(None)
            }
        }
    }

    /// Read-through: on a miss in both tiers, invoke the loader, store the
    /// result in both tiers, and publish an EVICT so peers drop stale
    /// copies. Loader failures surface and nothing is stored.
    pub async fn get_or_load(
        &self,
        region: &str,
        key: &str,
        loader: &dyn CacheLoader,
    ) -> Result<Arc<Value>> {
        let _op = self.begin_op().await?;
        validate_region_name(region)?;
        validate_key(key)?;

        if let Some(value) = self.get_inner(region, key).await? {
            return Ok(value);
        }

        let value = loader
            .load(key)
            .await
            .map_err(|e| CacheError::loader(key, e.to_string()))?;
        debug!(region = %region, key = %key, "loaded value on miss");

        let Some(bytes) = codec::encode(&value)? else {
            // A null load is returned to the caller but never cached.
            return Ok(Arc::new(value));
        };
        self.l2.put(region, key, &bytes, self.l2_ttl(region)).await?;
        let value = Arc::new(value);
        self.l1.region(region).put(key, Arc::clone(&value), None);
        self.publish(Command::evict(
            region,
            vec![key.to_string()],
            &self.sender_id,
        ))
        .await;
        Ok(value)
    }

    /// Write-through put. A null value is a request to evict.
    pub async fn put(&self, region: &str, key: &str, value: Value) -> Result<()> {
        let _op = self.begin_op().await?;
        validate_region_name(region)?;
        validate_key(key)?;
        self.put_inner(region, key, value, None).await
    }

    /// Write-through put with a per-call TTL. On the generic layout the
    /// TTL overrides the region's remote TTL; the hash layout silently
    /// ignores it. The near-cache entry honours the override either way,
    /// and an explicit zero means no expiry in both tiers.
    pub async fn put_with_ttl(
        &self,
        region: &str,
        key: &str,
        value: Value,
        ttl: Duration,
    ) -> Result<()> {
        let _op = self.begin_op().await?;
        validate_region_name(region)?;
        validate_key(key)?;
        self.put_inner(region, key, value, Some(ttl)).await
    }

    async fn put_inner(
        &self,
        region: &str,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let Some(bytes) = codec::encode(&value)? else {
            return self.evict_inner(region, vec![key.to_string()]).await;
        };

        let l2_ttl = ttl.or_else(|| self.l2_ttl(region));
        self.l2.put(region, key, &bytes, l2_ttl).await?;
        self.l1.region(region).put(key, Arc::new(value), ttl);
        self.publish(Command::evict(
            region,
            vec![key.to_string()],
            &self.sender_id,
        ))
        .await;
        Ok(())
    }

    /// Remove keys from both tiers and tell peers to do the same.
    pub async fn evict(&self, region: &str, keys: Vec<String>) -> Result<()> {
        let _op = self.begin_op().await?;
        validate_region_name(region)?;
        for key in &keys {
            validate_key(key)?;
        }
        self.evict_inner(region, keys).await
    }

    async fn evict_inner(&self, region: &str, keys: Vec<String>) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.l2.evict(region, &keys).await?;
        if let Some(near) = self.l1.existing(region) {
            near.evict(&keys, EvictionReason::Explicit);
        }
        self.publish(Command::evict(region, keys, &self.sender_id))
            .await;
        Ok(())
    }

    /// Drop a whole region from both tiers and tell peers to clear it.
    pub async fn clear(&self, region: &str) -> Result<()> {
        let _op = self.begin_op().await?;
        validate_region_name(region)?;
        self.l2.clear(region).await?;
        if let Some(near) = self.l1.existing(region) {
            near.clear(EvictionReason::Explicit);
        }
        self.publish(Command::clear(region, &self.sender_id)).await;
        Ok(())
    }

    /// Whether either tier holds the key. Remote errors degrade to the
    /// near-cache answer.
    pub async fn exists(&self, region: &str, key: &str) -> Result<bool> {
        let _op = self.begin_op().await?;
        validate_region_name(region)?;
        validate_key(key)?;

        if self
            .l1
            .existing(region)
            .is_some_and(|near| near.exists(key))
        {
            return Ok(true);
        }
        match self.l2.exists(region, key).await {
            Ok(present) => Ok(present),
            Err(e) => {
                warn!(region = %region, key = %key, error = %e, "remote exists failed, degrading");
                Ok(false)
            }
        }
    }

    /// Conditional insert. Returns the pre-existing value when the key was
    /// already present. Atomic on the generic layout; check-then-set on
    /// hash (see the layout docs).
    pub async fn put_if_absent(
        &self,
        region: &str,
        key: &str,
        value: Value,
    ) -> Result<Option<Value>> {
        let _op = self.begin_op().await?;
        validate_region_name(region)?;
        validate_key(key)?;

        let Some(bytes) = codec::encode(&value)? else {
            // Null stores nothing; report what is already there.
            let existing = self.l2.get(region, key).await?;
            return existing.map(|b| codec::decode(&b)).transpose();
        };

        match self.l2.put_if_absent(region, key, &bytes).await? {
            None => {
                self.l1.region(region).put(key, Arc::new(value), None);
                self.publish(Command::evict(
                    region,
                    vec![key.to_string()],
                    &self.sender_id,
                ))
                .await;
                Ok(None)
            }
            Some(previous) => codec::decode(&previous).map(Some),
        }
    }

    /// Atomic counter step in the remote tier. The near-cache copy is
    /// dropped locally and on peers; counters live remotely.
    pub async fn incr(&self, region: &str, key: &str, delta: i64) -> Result<i64> {
        let _op = self.begin_op().await?;
        validate_region_name(region)?;
        validate_key(key)?;

        let value = self.l2.incr(region, key, delta).await?;
        if let Some(near) = self.l1.existing(region) {
            near.evict(&[key.to_string()], EvictionReason::Explicit);
        }
        self.publish(Command::evict(
            region,
            vec![key.to_string()],
            &self.sender_id,
        ))
        .await;
        Ok(value)
    }

    pub async fn decr(&self, region: &str, key: &str, delta: i64) -> Result<i64> {
        self.incr(region, key, -delta).await
    }

    /// Union of near and remote keys for a region. Remote errors degrade
    /// to the near-cache snapshot.
    pub async fn keys(&self, region: &str) -> Result<Vec<String>> {
        let _op = self.begin_op().await?;
        validate_region_name(region)?;

        let mut keys: std::collections::BTreeSet<String> = match self.l2.keys(region).await {
            Ok(keys) => keys.into_iter().collect(),
            Err(e) => {
                warn!(region = %region, error = %e, "remote keys failed, returning near-cache snapshot");
                Default::default()
            }
        };
        if let Some(near) = self.l1.existing(region) {
            keys.extend(near.keys());
        }
        Ok(keys.into_iter().collect())
    }

    /// Snapshot of every region created on this node.
    pub async fn regions(&self) -> Result<Vec<RegionInfo>> {
        let _op = self.begin_op().await?;
        Ok(self
            .l1
            .regions()
            .into_iter()
            .map(|r| RegionInfo {
                name: r.name().to_string(),
                len: r.len(),
                policy: r.policy(),
            })
            .collect())
    }

    /// Apply a command received from the channel.
    ///
    /// Channel-driven evictions touch the near cache only, run inline on
    /// the receiver worker, and are never republished — the originating
    /// node already updated the remote tier.
    fn apply_command(&self, command: Command) {
        if command.is_from(&self.sender_id) {
            trace!(op = ?command.op, "suppressing own channel echo");
            return;
        }
        match command.op {
            Operation::Join => {
                info!(peer = %command.sender, "peer joined");
                self.peers.insert(command.sender, ());
            }
            Operation::Quit => {
                info!(peer = %command.sender, "peer quit");
                self.peers.remove(&command.sender);
            }
            Operation::Evict => {
                if let Some(near) = self.l1.existing(&command.region) {
                    let removed = near.evict(&command.keys, EvictionReason::Channel);
                    debug!(
                        region = %command.region,
                        peer = %command.sender,
                        removed,
                        "applied peer eviction"
                    );
                }
            }
            Operation::Clear => {
                if let Some(near) = self.l1.existing(&command.region) {
                    let removed = near.clear(EvictionReason::Channel);
                    debug!(
                        region = %command.region,
                        peer = %command.sender,
                        removed,
                        "applied peer clear"
                    );
                }
            }
            Operation::Unknown => {
                warn!(peer = %command.sender, "ignoring unknown channel operation");
            }
        }
    }

    /// Stop the broker: drain in-flight operations, publish QUIT, stop the
    /// receiver and the sweeper. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        // New operations already fail fast; wait out the in-flight ones.
        let _drain = self.lifecycle.write().await;

        if let Err(e) = self.channel.publish(&Command::quit(&self.sender_id)).await {
            warn!(error = %e, "could not announce QUIT");
        }
        if let Some(handle) = self.receiver.lock().expect("receiver lock").take() {
            handle.abort();
        }
        self.l1.stop_sweeper();
        info!(sender_id = %self.sender_id, "cache manager stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiercache_redis::RedisConfig;

    /// A manager pointed at a port nothing listens on: the remote tier and
    /// the channel are both down from the start.
    async fn unreachable_manager() -> Arc<CacheManager> {
        let mut config = CacheConfig::for_url("redis://127.0.0.1:1");
        config.redis = RedisConfig {
            url: config.redis.url.clone(),
            pool_size: 2,
            connect_timeout_ms: 200,
        };
        CacheManager::init(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_read_degrades_to_miss_when_remote_down() {
        let manager = unreachable_manager().await;
        assert!(manager.get("users", "u1").await.unwrap().is_none());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_write_fails_loudly_when_remote_down() {
        let manager = unreachable_manager().await;
        let err = manager
            .put("users", "u1", Value::Str("v".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::L2Unavailable(_)));
        // The near cache was not updated on the failed write.
        assert!(manager.peek_l1("users", "u1").is_none());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_bad_region_and_key_rejected() {
        let manager = unreachable_manager().await;
        assert!(matches!(
            manager.get("", "k").await.unwrap_err(),
            CacheError::BadRegion(_)
        ));
        assert!(matches!(
            manager.get("a:b", "k").await.unwrap_err(),
            CacheError::BadRegion(_)
        ));
        assert!(matches!(
            manager.get("users", "").await.unwrap_err(),
            CacheError::BadRegion(_)
        ));
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_operations_fail_after_shutdown() {
        let manager = unreachable_manager().await;
        manager.shutdown().await;
        assert!(matches!(
            manager.get("users", "u1").await.unwrap_err(),
            CacheError::ShuttingDown
        ));
        assert!(matches!(
            manager.put("users", "u1", Value::Bool(true)).await.unwrap_err(),
            CacheError::ShuttingDown
        ));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let manager = unreachable_manager().await;
        manager.shutdown().await;
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_self_echo_suppressed() {
        let manager = unreachable_manager().await;
        // Plant a near-cache entry directly; the remote tier is down.
        manager
            .l1
            .region("users")
            .put("u1", Arc::new(Value::Bool(true)), None);

        let own = Command::evict("users", vec!["u1".into()], manager.sender_id());
        manager.apply_command(own);
        assert!(manager.peek_l1("users", "u1").is_some());

        let peer = Command::evict("users", vec!["u1".into()], "some-peer");
        manager.apply_command(peer);
        assert!(manager.peek_l1("users", "u1").is_none());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_peer_membership_tracking() {
        let manager = unreachable_manager().await;
        manager.apply_command(Command::join("peer-1"));
        manager.apply_command(Command::join("peer-2"));
        let mut peers = manager.peers();
        peers.sort();
        assert_eq!(peers, vec!["peer-1", "peer-2"]);

        manager.apply_command(Command::quit("peer-1"));
        assert_eq!(manager.peers(), vec!["peer-2"]);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_channel_eviction_does_not_create_regions() {
        let manager = unreachable_manager().await;
        manager.apply_command(Command::evict("ghost", vec!["k".into()], "peer-1"));
        assert!(manager.l1.existing("ghost").is_none());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_channel_eviction_reason_is_channel() {
        let manager = unreachable_manager().await;
        manager
            .l1
            .region("users")
            .put("u1", Arc::new(Value::Bool(true)), None);
        let mut events = manager.subscribe_evictions();

        manager.apply_command(Command::evict("users", vec!["u1".into()], "peer-1"));
        let event = events.try_recv().unwrap();
        assert_eq!(event.reason, EvictionReason::Channel);
        assert_eq!(event.key, "u1");
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_init_rejects_invalid_config() {
        let mut config = CacheConfig::default();
        config.channel.clear();
        assert!(matches!(
            CacheManager::init(config).await.unwrap_err(),
            CacheError::Configuration(_)
        ));
    }
}
