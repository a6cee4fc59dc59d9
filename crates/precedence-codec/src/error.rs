use thiserror::Error;

/// Errors returned by envelope decoding and canonical encoding.
///
/// All of these are record-local and structural: retrying the same bytes
/// cannot succeed.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Record carried no key.
    #[error("record has no key")]
    MissingKey,
    /// Key bytes are not a valid key envelope.
    #[error("invalid key envelope: {0}")]
    InvalidKey(#[source] serde_json::Error),
    /// Value bytes are not valid JSON.
    #[error("invalid value envelope: {0}")]
    InvalidValue(#[source] serde_json::Error),
    /// A required envelope field is absent or has the wrong shape.
    #[error("missing or malformed field `{0}`")]
    MissingField(&'static str),
    /// Key schema name lacks the key-schema suffix.
    #[error("key schema name `{0}` does not end with `.Key`")]
    UnexpectedSchemaName(String),
    /// Canonical JSON serialization failure.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
}
