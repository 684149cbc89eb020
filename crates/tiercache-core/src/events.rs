//! Eviction event bus.
//!
//! The near-cache engine reports every eviction here instead of calling
//! listeners directly: events are pushed onto a broadcast channel after the
//! region lock is released, so a listener can never re-enter the engine
//! under the lock that fired it. Slow subscribers lose the oldest events
//! rather than applying backpressure to the cache itself.

use std::sync::Arc;
use tokio::sync::broadcast;

/// Default buffer size for the broadcast channel.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Why an entry left the near cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// The entry's TTL elapsed.
    Expired,
    /// The region was over capacity and this entry was the LRU victim.
    Capacity,
    /// A local `evict`/`clear` call.
    Explicit,
    /// An invalidation command from a peer node.
    Channel,
}

impl std::fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired => write!(f, "expired"),
            Self::Capacity => write!(f, "capacity"),
            Self::Explicit => write!(f, "explicit"),
            Self::Channel => write!(f, "channel"),
        }
    }
}

/// One eviction record.
#[derive(Debug, Clone)]
pub struct EvictionEvent {
    pub region: String,
    pub key: String,
    pub reason: EvictionReason,
}

impl EvictionEvent {
    pub fn new(
        region: impl Into<String>,
        key: impl Into<String>,
        reason: EvictionReason,
    ) -> Self {
        Self {
            region: region.into(),
            key: key.into(),
            reason,
        }
    }
}

/// Broadcaster for eviction events.
///
/// Cloneable and shareable; multiple subscribers each receive every event
/// emitted after they subscribed.
#[derive(Clone)]
pub struct EvictionBus {
    sender: broadcast::Sender<EvictionEvent>,
}

impl EvictionBus {
    /// Create a new bus with the default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new bus with a custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new bus wrapped in an `Arc` for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it; 0 when nobody
    /// is listening, which is not an error.
    pub fn emit(&self, event: EvictionEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    /// Subscribe to events emitted from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<EvictionEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EvictionBus {
    fn default() -> Self {
        Self::new()
    }
}
