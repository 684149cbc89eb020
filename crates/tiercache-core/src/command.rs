//! Invalidation commands exchanged over the pub/sub channel.
//!
//! The wire format is JSON: `{"op":"evict","region":"users","keys":["u1"],
//! "sender":"<uuid>"}`. Operations this build does not know deserialize to
//! [`Operation::Unknown`] so newer peers on the same topic stay compatible;
//! receivers log and ignore them.

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Channel operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// A node announces itself; peers record its sender id.
    Join,
    /// A node leaves; peers forget its sender id.
    Quit,
    /// Remove the listed keys from the local near cache.
    Evict,
    /// Clear the whole region in the local near cache.
    Clear,
    /// An operation from a newer protocol revision.
    #[serde(other)]
    Unknown,
}

/// One invalidation command.
///
/// `region` is empty for `Join`/`Quit`; `keys` is empty for everything but
/// `Evict`. `sender` is the publishing node's process-lifetime id and is
/// used to suppress self-echo on receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub op: Operation,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub keys: Vec<String>,
    pub sender: String,
}

impl Command {
    pub fn join(sender: impl Into<String>) -> Self {
        Self {
            op: Operation::Join,
            region: String::new(),
            keys: Vec::new(),
            sender: sender.into(),
        }
    }

    pub fn quit(sender: impl Into<String>) -> Self {
        Self {
            op: Operation::Quit,
            region: String::new(),
            keys: Vec::new(),
            sender: sender.into(),
        }
    }

    pub fn evict(region: impl Into<String>, keys: Vec<String>, sender: impl Into<String>) -> Self {
        Self {
            op: Operation::Evict,
            region: region.into(),
            keys,
            sender: sender.into(),
        }
    }

    pub fn clear(region: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            op: Operation::Clear,
            region: region.into(),
            keys: Vec::new(),
            sender: sender.into(),
        }
    }

    /// Whether this command originated on the node with the given id.
    pub fn is_from(&self, sender_id: &str) -> bool {
        self.sender == sender_id
    }

    pub fn to_wire(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CacheError::serialization(e.to_string()))
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::serialization(e.to_string()))
    }
}
