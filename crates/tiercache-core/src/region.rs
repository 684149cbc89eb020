//! Region naming and per-region policy.
//!
//! A region is a named cache namespace. Names are validated once at the
//! manager boundary; the `:` separator is reserved for the remote-tier
//! namespace prefix, so it cannot appear inside a region name.

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Separator between namespace, region, and key in the remote tier.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Capacity and TTL policy for one region.
///
/// `max_entries` bounds the near cache only (0 = unbounded). `ttl_secs`
/// bounds the near cache (0 = infinite). `l2_ttl_secs` applies to the
/// remote tier on the generic layout only; the hash layout has no
/// per-entry expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionPolicy {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default)]
    pub ttl_secs: u64,
    #[serde(default)]
    pub l2_ttl_secs: u64,
}

fn default_max_entries() -> usize {
    1000
}

impl Default for RegionPolicy {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: 0,
            l2_ttl_secs: 0,
        }
    }
}

impl RegionPolicy {
    /// An unbounded, never-expiring policy.
    pub fn unbounded() -> Self {
        Self {
            max_entries: 0,
            ttl_secs: 0,
            l2_ttl_secs: 0,
        }
    }
}

/// Validate a region name: non-empty and free of the reserved separator.
pub fn validate_region_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CacheError::bad_region("region name must not be empty"));
    }
    if name.contains(NAMESPACE_SEPARATOR) {
        return Err(CacheError::bad_region(format!(
            "region name '{name}' contains reserved separator '{NAMESPACE_SEPARATOR}'"
        )));
    }
    Ok(())
}

/// Validate a cache key: non-empty UTF-8.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::bad_region("cache key must not be empty"));
    }
    Ok(())
}

/// The remote-tier name of a region: `<namespace>:<region>`, or the bare
/// region when no namespace is configured. Distinct namespaces on a shared
/// store can never collide because names contain no separator themselves.
pub fn qualified_region(namespace: &str, region: &str) -> String {
    if namespace.is_empty() {
        region.to_string()
    } else {
        format!("{namespace}{NAMESPACE_SEPARATOR}{region}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_region_name("users").is_ok());
        assert!(validate_region_name("user_sessions-v2").is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = validate_region_name("").unwrap_err();
        assert!(matches!(err, CacheError::BadRegion(_)));
    }

    #[test]
    fn test_separator_rejected() {
        let err = validate_region_name("users:admin").unwrap_err();
        assert!(err.to_string().contains("reserved separator"));
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(validate_key("").is_err());
        assert!(validate_key("k").is_ok());
    }

    #[test]
    fn test_qualified_region() {
        assert_eq!(qualified_region("", "users"), "users");
        assert_eq!(qualified_region("prod", "users"), "prod:users");
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RegionPolicy::default();
        assert_eq!(policy.max_entries, 1000);
        assert_eq!(policy.ttl_secs, 0);
        assert_eq!(policy.l2_ttl_secs, 0);

        let unbounded = RegionPolicy::unbounded();
        assert_eq!(unbounded.max_entries, 0);
    }

    #[test]
    fn test_policy_serde_defaults() {
        let policy: RegionPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, RegionPolicy::default());

        let policy: RegionPolicy =
            serde_json::from_str(r#"{"max_entries":5,"ttl_secs":30}"#).unwrap();
        assert_eq!(policy.max_entries, 5);
        assert_eq!(policy.ttl_secs, 30);
        assert_eq!(policy.l2_ttl_secs, 0);
    }
}
