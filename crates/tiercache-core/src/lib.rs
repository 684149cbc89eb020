//! Core types for the tiercache two-level cache broker.
//!
//! Everything here is tier-agnostic: the value codec, the invalidation
//! command wire format, the eviction event bus, region naming/policy, and
//! the error model shared by the in-memory and remote engines.

pub mod codec;
pub mod command;
pub mod error;
pub mod events;
pub mod key;
pub mod region;

pub use codec::{Value, decode, encode};
pub use command::{Command, Operation};
pub use error::{CacheError, ErrorCategory, Result};
pub use events::{EvictionBus, EvictionEvent, EvictionReason};
pub use key::IntoCacheKey;
pub use region::{
    NAMESPACE_SEPARATOR, RegionPolicy, qualified_region, validate_key, validate_region_name,
};
