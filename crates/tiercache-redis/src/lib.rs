//! Remote-tier engine and invalidation transport (the L2 tier).
//!
//! Two region layouts over one pooled Redis client — `generic` (key per
//! entry, native TTL) and `hash` (hash per region, no TTL) — plus the
//! pub/sub channel the cache manager uses to keep peer near-caches
//! coherent.

pub mod channel;
pub mod generic;
pub mod hash;
pub mod pool;
pub mod store;

pub use channel::{CommandHandler, InvalidationChannel};
pub use generic::GenericLayout;
pub use hash::HashLayout;
pub use pool::{RedisConfig, create_pool};
pub use store::{L2Layout, RedisStore};
