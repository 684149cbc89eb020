//! The loader capability consumed by read-through gets.

use async_trait::async_trait;
use tiercache_core::Value;

/// Error type loaders may fail with; surfaced to the caller as
/// [`tiercache_core::CacheError::Loader`].
pub type LoaderError = Box<dyn std::error::Error + Send + Sync>;

/// Produces the value for a key the cache does not hold.
///
/// Invoked only by [`crate::CacheManager::get_or_load`]; a plain `get`
/// never loads. Failures propagate and nothing is cached.
#[async_trait]
pub trait CacheLoader: Send + Sync {
    async fn load(&self, key: &str) -> Result<Value, LoaderError>;
}

/// Adapter for synchronous loader closures.
pub struct FnLoader<F>(F);

impl<F> FnLoader<F>
where
    F: Fn(&str) -> Result<Value, LoaderError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> CacheLoader for FnLoader<F>
where
    F: Fn(&str) -> Result<Value, LoaderError> + Send + Sync,
{
    async fn load(&self, key: &str) -> Result<Value, LoaderError> {
        (self.0)(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_loader_delegates() {
        let loader = FnLoader::new(|key: &str| Ok(Value::Str(format!("loaded:{key}"))));
        let value = loader.load("u1").await.unwrap();
        assert_eq!(value.as_str(), Some("loaded:u1"));
    }

    #[tokio::test]
    async fn test_fn_loader_propagates_errors() {
        let loader = FnLoader::new(|_: &str| Err("backend down".into()));
        assert!(loader.load("u1").await.is_err());
    }
}
