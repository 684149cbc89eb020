//! One bounded in-memory region.
//!
//! All state lives behind a single per-region mutex: an entry map plus an
//! LRU order list (front = most recently used). TTL expiry is lazy on
//! access and also driven by the store's periodic sweep. Eviction events
//! are collected under the lock but emitted only after it is released, so
//! a listener can never deadlock against the region that fired it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tiercache_core::{EvictionBus, EvictionEvent, EvictionReason, RegionPolicy, Value};

use crate::entry::MemoryEntry;

pub struct MemoryRegion {
    name: String,
    policy: RegionPolicy,
    inner: Mutex<RegionInner>,
    bus: EvictionBus,
}

#[derive(Default)]
struct RegionInner {
    entries: HashMap<String, MemoryEntry>,
    /// LRU order, front = most recently used. Insertion places a key at
    /// the front, so among equally-recently-used entries the older
    /// `inserted_at` sits closer to the tail and is evicted first.
    order: VecDeque<String>,
}

impl RegionInner {
    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_front(key.to_string());
    }

    fn remove(&mut self, key: &str) -> Option<MemoryEntry> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry)
    }

    /// Drop every expired entry, collecting eviction records.
    fn prune_expired(&mut self, region: &str, out: &mut Vec<EvictionEvent>) {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.remove(&key);
            out.push(EvictionEvent::new(region, key, EvictionReason::Expired));
        }
    }
}

impl MemoryRegion {
    pub fn new(name: impl Into<String>, policy: RegionPolicy, bus: EvictionBus) -> Self {
        Self {
            name: name.into(),
            policy,
            inner: Mutex::new(RegionInner::default()),
            bus,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> RegionPolicy {
        self.policy
    }

    fn region_ttl(&self) -> Option<Duration> {
        (self.policy.ttl_secs > 0).then(|| Duration::from_secs(self.policy.ttl_secs))
    }

    fn emit_all(&self, events: Vec<EvictionEvent>) {
        for event in events {
            tracing::debug!(
                region = %event.region,
                key = %event.key,
                reason = %event.reason,
                "near-cache eviction"
            );
            self.bus.emit(event);
        }
    }

    /// Look up a key, refreshing its LRU position on a hit.
    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.lock().expect("region lock poisoned");
            let found = inner
                .entries
                .get(key)
                .map(|entry| (entry.is_expired(), Arc::clone(&entry.value)));
            match found {
                Some((true, _)) => {
                    inner.remove(key);
                    events.push(EvictionEvent::new(&self.name, key, EvictionReason::Expired));
                    None
                }
                Some((false, value)) => {
                    inner.touch(key);
                    Some(value)
                }
                None => None,
            }
        };
        self.emit_all(events);
        result
    }

    /// Presence check without refreshing the LRU position.
    pub fn exists(&self, key: &str) -> bool {
        let inner = self.inner.lock().expect("region lock poisoned");
        inner.entries.get(key).is_some_and(|e| !e.is_expired())
    }

    /// Insert or replace an entry.
    ///
    /// `ttl_override` takes precedence over the region TTL for this entry
    /// only; an explicit zero means no expiry, same as the remote tier.
    /// The new entry counts against capacity first; victims come off the
    /// LRU tail.
    pub fn put(&self, key: &str, value: Arc<Value>, ttl_override: Option<Duration>) {
        let ttl = ttl_override.or_else(|| self.region_ttl());
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock().expect("region lock poisoned");
            inner.entries.insert(key.to_string(), MemoryEntry::new(value, ttl));
            inner.touch(key);

            if self.policy.max_entries > 0 {
                while inner.entries.len() > self.policy.max_entries {
                    let Some(victim) = inner.order.pop_back() else {
                        break;
                    };
                    inner.entries.remove(&victim);
                    events.push(EvictionEvent::new(&self.name, victim, EvictionReason::Capacity));
                }
            }
        }
        self.emit_all(events);
    }

    /// Remove the given keys; returns how many were present.
    pub fn evict(&self, keys: &[String], reason: EvictionReason) -> usize {
        let mut events = Vec::new();
        let removed = {
            let mut inner = self.inner.lock().expect("region lock poisoned");
            let mut removed = 0;
            for key in keys {
                if inner.remove(key).is_some() {
                    removed += 1;
                    events.push(EvictionEvent::new(&self.name, key, reason));
                }
            }
            removed
        };
        self.emit_all(events);
        removed
    }

    /// Remove everything; returns how many entries were dropped.
    pub fn clear(&self, reason: EvictionReason) -> usize {
        let mut events = Vec::new();
        let removed = {
            let mut inner = self.inner.lock().expect("region lock poisoned");
            let keys: Vec<String> = inner.entries.keys().cloned().collect();
            inner.entries.clear();
            inner.order.clear();
            for key in &keys {
                events.push(EvictionEvent::new(&self.name, key, reason));
            }
            keys.len()
        };
        self.emit_all(events);
        removed
    }

    /// Snapshot of the live (non-expired) keys. Expired entries found on
    /// the way out are pruned.
    pub fn keys(&self) -> Vec<String> {
        let mut events = Vec::new();
        let keys = {
            let mut inner = self.inner.lock().expect("region lock poisoned");
            inner.prune_expired(&self.name, &mut events);
            inner.entries.keys().cloned().collect()
        };
        self.emit_all(events);
        keys
    }

    /// Count of live entries.
    pub fn len(&self) -> usize {
        let mut events = Vec::new();
        let len = {
            let mut inner = self.inner.lock().expect("region lock poisoned");
            inner.prune_expired(&self.name, &mut events);
            inner.entries.len()
        };
        self.emit_all(events);
        len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry; returns how many were swept.
    pub fn sweep(&self) -> usize {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock().expect("region lock poisoned");
            inner.prune_expired(&self.name, &mut events);
        }
        let swept = events.len();
        self.emit_all(events);
        swept
    }
}
