//! Broker configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tiercache_core::{RegionPolicy, region::validate_region_name};
use tiercache_redis::{L2Layout, RedisConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prefix for every remote-tier key. Distinct namespaces sharing one
    /// Redis database never see each other's entries.
    #[serde(default)]
    pub namespace: String,
    /// Remote region layout.
    #[serde(default)]
    pub storage: L2Layout,
    /// Pub/sub topic carrying invalidation commands.
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default)]
    pub redis: RedisConfig,
    /// Per-region policies; regions not listed here use `default_region`.
    #[serde(default)]
    pub regions: HashMap<String, RegionPolicy>,
    #[serde(default)]
    pub default_region: RegionPolicy,
    /// Period of the near-cache expiry sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_channel() -> String {
    "tiercache:events".into()
}

fn default_sweep_interval_secs() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            storage: L2Layout::default(),
            channel: default_channel(),
            redis: RedisConfig::default(),
            regions: HashMap::new(),
            default_region: RegionPolicy::default(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    /// A config pointing at the given Redis URL, everything else default.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            redis: RedisConfig {
                url: url.into(),
                ..RedisConfig::default()
            },
            ..Self::default()
        }
    }

    /// Set the policy for one region.
    pub fn with_region(mut self, name: impl Into<String>, policy: RegionPolicy) -> Self {
        self.regions.insert(name.into(), policy);
        self
    }

    /// The policy a region resolves to.
    pub fn policy_for(&self, region: &str) -> RegionPolicy {
        self.regions
            .get(region)
            .copied()
            .unwrap_or(self.default_region)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.redis.url.is_empty() {
            return Err("redis.url must not be empty".into());
        }
        if self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
        }
        if self.channel.is_empty() {
            return Err("channel must not be empty".into());
        }
        if self.sweep_interval_secs == 0 {
            return Err("sweep_interval_secs must be > 0".into());
        }
        if self.namespace.contains(tiercache_core::NAMESPACE_SEPARATOR) {
            return Err(format!(
                "namespace '{}' must not contain ':'",
                self.namespace
            ));
        }
        for name in self.regions.keys() {
            validate_region_name(name).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}
