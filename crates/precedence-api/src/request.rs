use precedence_codec::canonical::to_canonical_vec;
use precedence_codec::error::CodecError;
use precedence_core::hash::sha256_hex;
use precedence_core::CanonicalRecord;
use reqwest::Url;
use thiserror::Error;

/// Path appended to the configured base URL.
pub const RECORDS_PATH: &str = "records";
/// Registration bodies are opaque bytes to the service.
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("http client init failed: {0}")]
    HttpClient(reqwest::Error),
    #[error("body encode failed: {0}")]
    Encode(#[from] CodecError),
}

/// Fully prepared registration call for one canonical record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub id: String,
    pub chain: String,
    pub store: bool,
    /// Hex SHA-256 of `body`.
    pub hash: String,
    /// Canonical JSON of the record's data, `null` for deletes.
    pub body: Vec<u8>,
}

impl RegistrationRequest {
    pub fn from_record(record: &CanonicalRecord, store: bool) -> Result<Self, ApiError> {
        let body = to_canonical_vec(&record.data)?;
        Ok(Self {
            id: record.id.clone(),
            chain: record.chain.clone(),
            store,
            hash: sha256_hex(&body),
            body,
        })
    }

    /// `{base}/records?id=..&store=..&hash=..&chain=..`, form-encoded.
    pub fn url(&self, base: &Url) -> Url {
        let mut url = records_endpoint(base);
        url.query_pairs_mut()
            .append_pair("id", &self.id)
            .append_pair("store", if self.store { "true" } else { "false" })
            .append_pair("hash", &self.hash)
            .append_pair("chain", &self.chain);
        url
    }
}

/// Parses and validates the configured API base URL.
pub fn parse_base_url(base: &str) -> Result<Url, ApiError> {
    let invalid = |reason: String| ApiError::InvalidBaseUrl {
        url: base.to_string(),
        reason,
    };
    let url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http(s) base url".to_string()));
    }
    Ok(url)
}

fn records_endpoint(base: &Url) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    let path = format!("{}/{RECORDS_PATH}", base.path().trim_end_matches('/'));
    url.set_path(&path);
    url
}
