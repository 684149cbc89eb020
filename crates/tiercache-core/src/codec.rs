//! Self-describing value codec for the remote tier.
//!
//! Every stored value is framed as a single tag byte followed by the
//! payload: fixed-width big-endian for scalars, a `u32` big-endian length
//! prefix plus body for variable-width shapes. The tag set is closed;
//! callers with richer types wrap their own serialized bytes in
//! [`Value::Object`] and keep the codec adapter on their side.
//!
//! `Null` is accepted but never stored: [`encode`] returns `Ok(None)` for
//! it, and callers treat a null value as a request to evict.

use crate::error::{CacheError, Result};

const TAG_STR: u8 = 0x01;
const TAG_BOOL: u8 = 0x02;
const TAG_I8: u8 = 0x03;
const TAG_I16: u8 = 0x04;
const TAG_I32: u8 = 0x05;
const TAG_I64: u8 = 0x06;
const TAG_F32: u8 = 0x07;
const TAG_F64: u8 = 0x08;
const TAG_BYTES: u8 = 0x09;
const TAG_DATE: u8 = 0x0a;
const TAG_OBJECT: u8 = 0x0b;

/// A cacheable value.
///
/// `Date` carries epoch milliseconds. `Object` is an opaque payload
/// produced by a caller-side codec adapter; the broker frames it but never
/// inspects it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    Date(i64),
    Object(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The value as an `i64` if it carries any integer shape.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(v) => Some(i64::from(*v)),
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(f64::from(*v)),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) | Value::Object(b) => Some(b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// Encode a value into its framed byte form.
///
/// Returns `Ok(None)` for `Null`: a null value is never stored, callers
/// treat it as an eviction request.
pub fn encode(value: &Value) -> Result<Option<Vec<u8>>> {
    let bytes = match value {
        Value::Null => return Ok(None),
        Value::Str(s) => frame_variable(TAG_STR, s.as_bytes())?,
        Value::Bool(b) => vec![TAG_BOOL, u8::from(*b)],
        Value::I8(v) => {
            let mut out = vec![TAG_I8];
            out.extend_from_slice(&v.to_be_bytes());
            out
        }
        Value::I16(v) => {
            let mut out = vec![TAG_I16];
            out.extend_from_slice(&v.to_be_bytes());
            out
        }
        Value::I32(v) => {
            let mut out = vec![TAG_I32];
            out.extend_from_slice(&v.to_be_bytes());
            out
        }
        Value::I64(v) => {
            let mut out = vec![TAG_I64];
            out.extend_from_slice(&v.to_be_bytes());
            out
        }
        Value::F32(v) => {
            let mut out = vec![TAG_F32];
            out.extend_from_slice(&v.to_be_bytes());
            out
        }
        Value::F64(v) => {
            let mut out = vec![TAG_F64];
            out.extend_from_slice(&v.to_be_bytes());
            out
        }
        Value::Bytes(b) => frame_variable(TAG_BYTES, b)?,
        Value::Date(millis) => {
            let mut out = vec![TAG_DATE];
            out.extend_from_slice(&millis.to_be_bytes());
            out
        }
        Value::Object(b) => frame_variable(TAG_OBJECT, b)?,
    };
    Ok(Some(bytes))
}

/// Decode a framed byte form back into a value.
///
/// The whole buffer must be consumed; trailing garbage is a corruption
/// signal, not something to silently skip.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let (&tag, payload) = bytes
        .split_first()
        .ok_or_else(|| CacheError::serialization("empty buffer"))?;

    let value = match tag {
        TAG_STR => {
            let body = unframe_variable(payload)?;
            Value::Str(
                String::from_utf8(body.to_vec())
                    .map_err(|e| CacheError::serialization(format!("invalid utf-8: {e}")))?,
            )
        }
        TAG_BOOL => {
            let byte = exact::<1>(payload)?[0];
            match byte {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(CacheError::serialization(format!(
                        "invalid boolean byte {other:#04x}"
                    )));
                }
            }
        }
        TAG_I8 => Value::I8(i8::from_be_bytes(exact::<1>(payload)?)),
        TAG_I16 => Value::I16(i16::from_be_bytes(exact::<2>(payload)?)),
        TAG_I32 => Value::I32(i32::from_be_bytes(exact::<4>(payload)?)),
        TAG_I64 => Value::I64(i64::from_be_bytes(exact::<8>(payload)?)),
        TAG_F32 => Value::F32(f32::from_be_bytes(exact::<4>(payload)?)),
        TAG_F64 => Value::F64(f64::from_be_bytes(exact::<8>(payload)?)),
        TAG_BYTES => Value::Bytes(unframe_variable(payload)?.to_vec()),
        TAG_DATE => Value::Date(i64::from_be_bytes(exact::<8>(payload)?)),
        TAG_OBJECT => Value::Object(unframe_variable(payload)?.to_vec()),
        other => {
            return Err(CacheError::serialization(format!(
                "unknown value tag {other:#04x}"
            )));
        }
    };
    Ok(value)
}

fn frame_variable(tag: u8, body: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(body.len())
        .map_err(|_| CacheError::serialization(format!("payload too large: {} bytes", body.len())))?;
    let mut out = Vec::with_capacity(1 + 4 + body.len());
    out.push(tag);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(body);
    Ok(out)
}

fn unframe_variable(payload: &[u8]) -> Result<&[u8]> {
    if payload.len() < 4 {
        return Err(CacheError::serialization("truncated length prefix"));
    }
    let (len_bytes, body) = payload.split_at(4);
    let len = u32::from_be_bytes(len_bytes.try_into().expect("split_at(4)")) as usize;
    if body.len() != len {
        return Err(CacheError::serialization(format!(
            "length prefix {len} does not match body of {} bytes",
            body.len()
        )));
    }
    Ok(body)
}

fn exact<const N: usize>(payload: &[u8]) -> Result<[u8; N]> {
    payload
        .try_into()
        .map_err(|_| CacheError::serialization(format!("expected {N}-byte payload, got {}", payload.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_null_declines_to_store() {
        assert_eq!(encode(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_string_round_trip() {
        let v = Value::Str("héllo wörld".to_string());
        let bytes = encode(&v).unwrap().unwrap();
        assert_eq!(bytes[0], TAG_STR);
        assert_eq!(decode(&bytes).unwrap(), v);
    }

    #[test]
    fn test_empty_string_and_bytes() {
        for v in [Value::Str(String::new()), Value::Bytes(vec![]), Value::Object(vec![])] {
            let bytes = encode(&v).unwrap().unwrap();
            assert_eq!(decode(&bytes).unwrap(), v);
        }
    }

    #[test]
    fn test_scalar_round_trips() {
        let values = [
            Value::Bool(true),
            Value::Bool(false),
            Value::I8(-5),
            Value::I16(1234),
            Value::I32(-99_999),
            Value::I64(i64::MIN),
            Value::F32(1.5),
            Value::F64(-2.25),
            Value::Date(1_700_000_000_000),
        ];
        for v in values {
            let bytes = encode(&v).unwrap().unwrap();
            assert_eq!(decode(&bytes).unwrap(), v, "round trip for {v:?}");
        }
    }

    #[test]
    fn test_decode_rejects_empty() {
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        let err = decode(&[0xff, 0x00]).unwrap_err();
        assert!(err.to_string().contains("unknown value tag"));
    }

    #[test]
    fn test_decode_rejects_truncated_scalar() {
        assert!(decode(&[TAG_I64, 0x01, 0x02]).is_err());
    }

    #[test]
    fn test_decode_rejects_trailing_garbage() {
        let mut bytes = encode(&Value::I32(7)).unwrap().unwrap();
        bytes.push(0x00);
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_length_prefix() {
        // Claims a 10-byte body but carries 2.
        let bytes = [TAG_BYTES, 0, 0, 0, 10, 0xaa, 0xbb];
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_bool() {
        assert!(decode(&[TAG_BOOL, 2]).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let bytes = [TAG_STR, 0, 0, 0, 2, 0xff, 0xfe];
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::I16(9).as_i64(), Some(9));
        assert_eq!(Value::Str("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::F32(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::Bytes(vec![1]).as_bytes(), Some(&[1u8][..]));
        assert_eq!(Value::Str("x".into()).as_i64(), None);
        assert!(Value::Null.is_null());
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            ".*".prop_map(Value::Str),
            any::<bool>().prop_map(Value::Bool),
            any::<i8>().prop_map(Value::I8),
            any::<i16>().prop_map(Value::I16),
            any::<i32>().prop_map(Value::I32),
            any::<i64>().prop_map(Value::I64),
            // NaN is not reflexively equal; the codec preserves bits but the
            // structural-equality property is stated over comparable floats.
            any::<f32>().prop_filter("non-NaN", |f| !f.is_nan()).prop_map(Value::F32),
            any::<f64>().prop_filter("non-NaN", |f| !f.is_nan()).prop_map(Value::F64),
            proptest::collection::vec(any::<u8>(), 0..512).prop_map(Value::Bytes),
            any::<i64>().prop_map(Value::Date),
            proptest::collection::vec(any::<u8>(), 0..512).prop_map(Value::Object),
        ]
    }

    proptest! {
        #[test]
        fn prop_round_trip(v in arb_value()) {
            let bytes = encode(&v).unwrap().expect("non-null");
            prop_assert_eq!(decode(&bytes).unwrap(), v);
        }

        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = decode(&bytes);
        }
    }
}
