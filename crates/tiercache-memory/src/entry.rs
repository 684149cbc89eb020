//! A single near-cache entry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tiercache_core::Value;

/// A cached entry with its insertion time and optional expiry.
///
/// The value is behind an `Arc` so readers that obtained it before an
/// eviction keep a valid reference; the map drops its copy, the last
/// reader drops the value.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub value: Arc<Value>,
    pub inserted_at: Instant,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    /// Create a new entry. A zero TTL means no expiry.
    pub fn new(value: Arc<Value>, ttl: Option<Duration>) -> Self {
        let inserted_at = Instant::now();
        let expires_at = ttl
            .filter(|d| !d.is_zero())
            .map(|d| inserted_at + d);
        Self {
            value,
            inserted_at,
            expires_at,
        }
    }

    /// An entry is invisible from the instant its TTL fully elapses.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ttl_never_expires() {
        let entry = MemoryEntry::new(Arc::new(Value::I32(1)), None);
        assert!(!entry.is_expired());

        let entry = MemoryEntry::new(Arc::new(Value::I32(1)), Some(Duration::ZERO));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_ttl_expiry_boundary() {
        let entry = MemoryEntry::new(
            Arc::new(Value::Str("v".into())),
            Some(Duration::from_millis(30)),
        );
        assert!(!entry.is_expired());
        std::thread::sleep(Duration::from_millis(45));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_value_shared_after_drop() {
        let value = Arc::new(Value::Str("shared".into()));
        let entry = MemoryEntry::new(Arc::clone(&value), None);
        let reader = Arc::clone(&entry.value);
        drop(entry);
        assert_eq!(reader.as_str(), Some("shared"));
    }
}
