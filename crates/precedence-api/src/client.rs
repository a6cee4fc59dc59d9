use std::time::Duration;

use async_trait::async_trait;
use precedence_core::RegistrationOutcome;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tracing::debug;

use crate::request::{parse_base_url, ApiError, RegistrationRequest, CONTENT_TYPE_OCTET_STREAM};
use crate::response::classify_response;
use crate::ProvenanceApi;

/// reqwest-backed client for the provenance service.
#[derive(Debug, Clone)]
pub struct HttpProvenanceClient {
    http: Client,
    base: Url,
}

impl HttpProvenanceClient {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let base = parse_base_url(base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ApiError::HttpClient)?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl ProvenanceApi for HttpProvenanceClient {
    async fn register(&self, request: &RegistrationRequest) -> RegistrationOutcome {
        let url = request.url(&self.base);
        debug!(%url, bytes = request.body.len(), "registering record");
        let response = match self
            .http
            .post(url)
            .header(CONTENT_TYPE, CONTENT_TYPE_OCTET_STREAM)
            .body(request.body.clone())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return RegistrationOutcome::transient(format!("transport error: {e}")),
        };
        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(body) => classify_response(status, &body),
            Err(e) => RegistrationOutcome::transient(format!(
                "failed reading {status} response body: {e}"
            )),
        }
    }
}
