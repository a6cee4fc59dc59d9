use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

use crate::error::CodecError;

/// Serializes a JSON value with object keys in ascending byte order at every
/// depth and no insignificant whitespace.
///
/// Key order is imposed here rather than inherited from `serde_json::Map`, so
/// the output does not depend on whether `preserve_order` is enabled anywhere
/// in the dependency graph.
#[derive(Debug, Clone, Copy)]
pub struct Canonical<'a>(pub &'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&Canonical(item))?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let mut out = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    out.serialize_entry(key, &Canonical(value))?;
                }
                out.end()
            }
            other => other.serialize(serializer),
        }
    }
}

/// Canonical JSON text for `value`.
pub fn to_canonical_string(value: &Value) -> Result<String, CodecError> {
    serde_json::to_string(&Canonical(value)).map_err(CodecError::Encode)
}

/// Canonical JSON bytes for `value`; `Value::Null` encodes as `null`.
pub fn to_canonical_vec(value: &Value) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(&Canonical(value)).map_err(CodecError::Encode)
}
