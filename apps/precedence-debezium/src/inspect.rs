//! Offline decoding of one key/value pair.

use std::path::Path;

use precedence_api::request::parse_base_url;
use precedence_api::RegistrationRequest;
use precedence_codec::envelope::decode_record;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("decode failed: {0}")]
    Decode(#[from] precedence_codec::error::CodecError),
    #[error(transparent)]
    Request(#[from] precedence_api::ApiError),
}

/// What the relay would register for the given envelope.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Inspection {
    /// No value: consumed as a tombstone and never registered.
    Tombstone,
    Record {
        id: String,
        chain: String,
        data: Value,
        hash: String,
        url: String,
    },
}

fn read(path: &Path) -> Result<Vec<u8>, InspectError> {
    std::fs::read(path).map_err(|source| InspectError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// A missing `value` path stands for a tombstone; an empty value file is
/// decoded like any other and fails.
pub fn inspect_files(
    key: &Path,
    value: Option<&Path>,
    api: &str,
    store: bool,
) -> Result<Inspection, InspectError> {
    let key = read(key)?;
    let value = value.map(read).transpose()?;
    inspect(&key, value.as_deref(), api, store)
}

pub fn inspect(
    key: &[u8],
    value: Option<&[u8]>,
    api: &str,
    store: bool,
) -> Result<Inspection, InspectError> {
    let Some(value) = value else {
        return Ok(Inspection::Tombstone);
    };
    let base = parse_base_url(api)?;
    let record = decode_record(Some(key), value)?;
    let request = RegistrationRequest::from_record(&record, store)?;
    Ok(Inspection::Record {
        url: request.url(&base).to_string(),
        id: record.id,
        chain: record.chain,
        data: record.data,
        hash: request.hash,
    })
}
