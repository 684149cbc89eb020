//! In-process near-cache engine (the L1 tier).
//!
//! Regions are bounded maps with LRU capacity eviction and TTL expiry,
//! each behind its own mutex. Every eviction — capacity, TTL, explicit
//! call, or channel-driven — is reported with its reason on the store's
//! eviction bus; see [`tiercache_core::EvictionBus`] for the delivery
//! contract.

pub mod entry;
pub mod region;
pub mod store;

pub use entry::MemoryEntry;
pub use region::MemoryRegion;
pub use store::MemoryStore;
