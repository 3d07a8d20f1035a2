//! Tools to move persisted values to and from CBOR bytes

use serde::{de::DeserializeOwned, Serialize};

pub use ciborium::value::Value;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Type Mismatch: expected: {expected:?}, found {found:?}")]
    WrongType { expected: String, found: String },
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Map(_) => "map",
        Value::Array(_) => "array",
        Value::Text(_) => "text",
        Value::Bytes(_) => "bytes",
        Value::Integer(_) | Value::Float(_) => "number",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        _ => "other",
    }
}

/// Encode a value to CBOR bytes
pub fn to_bytes<T: Serialize>(t: &T) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Vec::<u8>::new();

    ciborium::ser::into_writer(t, &mut buffer)
        .map_err(|e| CodecError::Encode(e.to_string()))?;

    Ok(buffer)
}

/// Decode a value from CBOR bytes.
///
/// Persisted values are expected to be maps; anything else is reported as a
/// type mismatch before serde gets a chance to produce a vaguer error.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let value: Value = ciborium::de::from_reader(bytes)
        .map_err(|e| CodecError::Decode(e.to_string()))?;

    if !matches!(value, Value::Map(_)) {
        return Err(CodecError::WrongType {
            expected: "map".into(),
            found: kind_of(&value).into(),
        });
    }

    value
        .deserialized()
        .map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::preferences::Preferences;

    #[test]
    fn preferences_survive_encoding() {
        let mut prefs = Preferences::with_columns(["id", "state"]);
        prefs.page_size = 50;
        prefs.wrap_lines = true;

        let bytes = to_bytes(&prefs).expect("Pack");
        let other: Preferences = from_bytes(&bytes).expect("Unpack");

        assert_eq!(prefs, other);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let r: Result<Preferences, _> = from_bytes(&[0xff, 0x00, 0x13]);
        assert!(matches!(r, Err(CodecError::Decode(_))));

        let r: Result<Preferences, _> = from_bytes(b"{\"page_size\": 10}");
        assert!(r.is_err());
    }

    #[test]
    fn non_map_is_a_type_mismatch() {
        let bytes = to_bytes(&vec![1, 2, 3]).unwrap();
        let r: Result<BTreeMap<String, u32>, _> = from_bytes(&bytes);

        match r {
            Err(CodecError::WrongType { found, .. }) => {
                assert_eq!(found, "array")
            }
            other => panic!("unexpected: {other:?}"),
        }

        let bytes = to_bytes(&"page_size").unwrap();
        let r: Result<BTreeMap<String, u32>, _> = from_bytes(&bytes);
        assert!(matches!(
            r,
            Err(CodecError::WrongType { found, .. }) if found == "text"
        ));
    }
}
