use precedence_core::hash::sha256_hex;
use precedence_core::CanonicalRecord;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::canonical::to_canonical_string;
use crate::error::CodecError;

/// Suffix every CDC key schema name carries, including its separator.
pub const KEY_SCHEMA_SUFFIX: &str = ".Key";

#[derive(Debug, Deserialize)]
struct KeyEnvelope {
    schema: KeySchema,
    payload: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct KeySchema {
    name: String,
}

/// Derives the chain string from raw key bytes.
///
/// `dbserver.table.Key` with payload `{"b":2,"a":1}` yields
/// `dbserver.table{"a":1,"b":2}`.
pub fn derive_chain(key: &[u8]) -> Result<String, CodecError> {
    let envelope: KeyEnvelope = serde_json::from_slice(key).map_err(CodecError::InvalidKey)?;
    let Some(base) = envelope.schema.name.strip_suffix(KEY_SCHEMA_SUFFIX) else {
        return Err(CodecError::UnexpectedSchemaName(envelope.schema.name));
    };
    let fields = to_canonical_string(&Value::Object(envelope.payload))?;
    Ok(format!("{base}{fields}"))
}

/// Extracts `payload.after` from raw value bytes.
///
/// A JSON `null` (delete) is returned as `Value::Null`; an absent field is an
/// error.
pub fn extract_after(value: &[u8]) -> Result<Value, CodecError> {
    let envelope: Value = serde_json::from_slice(value).map_err(CodecError::InvalidValue)?;
    let payload = envelope
        .get("payload")
        .and_then(Value::as_object)
        .ok_or(CodecError::MissingField("payload"))?;
    payload
        .get("after")
        .cloned()
        .ok_or(CodecError::MissingField("payload.after"))
}

/// Decodes one non-tombstone CDC record into its canonical triple.
///
/// `id` is computed over `value` exactly as consumed, before any parsing.
pub fn decode_record(key: Option<&[u8]>, value: &[u8]) -> Result<CanonicalRecord, CodecError> {
    let key = key.ok_or(CodecError::MissingKey)?;
    let chain = derive_chain(key)?;
    let data = extract_after(value)?;
    Ok(CanonicalRecord {
        id: sha256_hex(value),
        chain,
        data,
    })
}
