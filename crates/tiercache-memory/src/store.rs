//! Region registry and periodic TTL sweeper.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tiercache_core::{EvictionBus, RegionPolicy};
use tokio::task::JoinHandle;

use crate::region::MemoryRegion;

/// The near-cache store: named regions created lazily on first use, all
/// reporting evictions onto one shared bus.
pub struct MemoryStore {
    regions: DashMap<String, Arc<MemoryRegion>>,
    policies: HashMap<String, RegionPolicy>,
    default_policy: RegionPolicy,
    bus: EvictionBus,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryStore {
    pub fn new(policies: HashMap<String, RegionPolicy>, default_policy: RegionPolicy) -> Self {
        Self {
            regions: DashMap::new(),
            policies,
            default_policy,
            bus: EvictionBus::new(),
            sweeper: Mutex::new(None),
        }
    }

    /// The eviction event bus shared by every region.
    pub fn eviction_bus(&self) -> &EvictionBus {
        &self.bus
    }

    /// The policy a region would be created with.
    pub fn policy_for(&self, name: &str) -> RegionPolicy {
        self.policies.get(name).copied().unwrap_or(self.default_policy)
    }

    /// Get or lazily create a region. Regions live until the store drops.
    pub fn region(&self, name: &str) -> Arc<MemoryRegion> {
        self.regions
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(region = %name, "creating near-cache region");
                Arc::new(MemoryRegion::new(name, self.policy_for(name), self.bus.clone()))
            })
            .clone()
    }

    /// An already-created region, if any. Channel-driven invalidations use
    /// this so a peer's traffic never materialises regions locally.
    pub fn existing(&self, name: &str) -> Option<Arc<MemoryRegion>> {
        self.regions.get(name).map(|r| Arc::clone(r.value()))
    }

    /// Snapshot of every live region.
    pub fn regions(&self) -> Vec<Arc<MemoryRegion>> {
        self.regions.iter().map(|r| Arc::clone(r.value())).collect()
    }

    /// Start the periodic expiry sweep. Idempotent: a second call replaces
    /// the previous sweeper.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) {
        let store: Weak<MemoryStore> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    return;
                };
                let mut swept = 0;
                for region in store.regions() {
                    swept += region.sweep();
                }
                if swept > 0 {
                    tracing::debug!(count = swept, "swept expired near-cache entries");
                }
            }
        });
        if let Some(previous) = self.sweeper.lock().expect("sweeper lock").replace(handle) {
            previous.abort();
        }
    }

    /// Stop the sweeper if one is running.
    pub fn stop_sweeper(&self) {
        if let Some(handle) = self.sweeper.lock().expect("sweeper lock").take() {
            handle.abort();
        }
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tiercache_core::Value;

    fn store_with(name: &str, policy: RegionPolicy) -> Arc<MemoryStore> {
        let mut policies = HashMap::new();
        policies.insert(name.to_string(), policy);
        Arc::new(MemoryStore::new(policies, RegionPolicy::default()))
    }

    #[test]
    fn test_lazy_region_creation() {
        let store = store_with(
            "users",
            RegionPolicy {
                max_entries: 5,
                ttl_secs: 0,
                l2_ttl_secs: 0,
            },
        );
        assert!(store.existing("users").is_none());

        let region = store.region("users");
        assert_eq!(region.policy().max_entries, 5);
        assert!(store.existing("users").is_some());

        // Same instance on repeat access.
        assert!(Arc::ptr_eq(&region, &store.region("users")));
    }

    #[test]
    fn test_unconfigured_region_gets_default_policy() {
        let store = store_with("users", RegionPolicy::unbounded());
        let other = store.region("sessions");
        assert_eq!(other.policy(), RegionPolicy::default());
    }

    #[test]
    fn test_regions_snapshot() {
        let store = store_with("users", RegionPolicy::default());
        store.region("a");
        store.region("b");
        let mut names: Vec<String> = store
            .regions()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_sweeper_prunes_expired_entries() {
        let store = store_with(
            "fast",
            RegionPolicy {
                max_entries: 0,
                ttl_secs: 0,
                l2_ttl_secs: 0,
            },
        );
        let region = store.region("fast");
        region.put(
            "k1",
            Arc::new(Value::Bool(true)),
            Some(Duration::from_millis(20)),
        );

        store.start_sweeper(Duration::from_millis(25));
        tokio::time::sleep(Duration::from_millis(80)).await;
        store.stop_sweeper();

        assert!(region.is_empty());
    }

    #[tokio::test]
    async fn test_stop_sweeper_is_idempotent() {
        let store = store_with("users", RegionPolicy::default());
        store.start_sweeper(Duration::from_secs(60));
        store.stop_sweeper();
        store.stop_sweeper();
    }
}
