//! Scalar-to-string key coercion for the public façade.
//!
//! Coercion is deterministic: integers render in base 10, booleans as
//! `true`/`false`, byte slices as standard base64. Strings pass through
//! unchanged.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// A type usable as a cache key.
pub trait IntoCacheKey {
    fn into_cache_key(self) -> String;
}

impl IntoCacheKey for String {
    fn into_cache_key(self) -> String {
        self
    }
}

impl IntoCacheKey for &str {
    fn into_cache_key(self) -> String {
        self.to_string()
    }
}

impl IntoCacheKey for &String {
    fn into_cache_key(self) -> String {
        self.clone()
    }
}

impl IntoCacheKey for bool {
    fn into_cache_key(self) -> String {
        if self { "true".into() } else { "false".into() }
    }
}

impl IntoCacheKey for &[u8] {
    fn into_cache_key(self) -> String {
        STANDARD.encode(self)
    }
}

impl IntoCacheKey for Vec<u8> {
    fn into_cache_key(self) -> String {
        STANDARD.encode(&self)
    }
}

macro_rules! impl_numeric_key {
    ($($t:ty),*) => {
        $(
            impl IntoCacheKey for $t {
                fn into_cache_key(self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_numeric_key!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, usize, isize, f32, f64);
