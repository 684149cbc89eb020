//! Two-level cache broker.
//!
//! Combines a fast in-process near cache (L1) with a shared Redis tier
//! (L2) behind one uniform API, and keeps multiple application nodes
//! coherent by broadcasting invalidation commands over Redis pub/sub.
//!
//! ## Tiers
//!
//! - **L1** — per-region bounded maps in process memory; microsecond
//!   reads; LRU capacity eviction and TTL expiry.
//! - **L2** — Redis, shared by every node; `generic` (key per entry,
//!   native TTL) or `hash` (hash per region) layout.
//!
//! Reads go L1 → L2 → optional loader; mutations go L2 → L1 → publish,
//! so peers always observe monotonic state through the shared tier.
//!
//! ## Example
//!
//! ```ignore
//! use tiercache::{Cache, CacheConfig, CacheManager};
//!
//! let config = CacheConfig::for_url("redis://127.0.0.1:6379");
//! let manager = CacheManager::init(config).await?;
//! let cache = Cache::new(manager);
//!
//! cache.put("users", 42i64, "alice").await?;
//! let name = cache.get_string("users", 42i64).await?;
//!
//! cache.manager().shutdown().await;
//! ```

pub mod config;
pub mod facade;
pub mod loader;
pub mod manager;

pub use config::CacheConfig;
pub use facade::Cache;
pub use loader::{CacheLoader, FnLoader, LoaderError};
pub use manager::{CacheManager, RegionInfo};

pub use tiercache_core::{
    CacheError, Command, ErrorCategory, EvictionEvent, EvictionReason, IntoCacheKey, Operation,
    RegionPolicy, Result, Value,
};
pub use tiercache_redis::{L2Layout, RedisConfig};
