//! Provenance API client for precedence.
//!
//! Builds `POST /records` registration requests from canonical records and
//! classifies responses into [`RegistrationOutcome`]s. The delivery loop only
//! depends on the [`ProvenanceApi`] trait.

pub mod client;
pub mod request;
pub mod response;
pub mod scripted;

use async_trait::async_trait;
pub use client::HttpProvenanceClient;
pub use precedence_core::RegistrationOutcome;
pub use request::{ApiError, RegistrationRequest};
pub use scripted::ScriptedProvenanceApi;

/// One-endpoint contract of the provenance service.
#[async_trait]
pub trait ProvenanceApi: Send + Sync {
    /// Sends one registration attempt. Never fails: every problem is folded
    /// into [`RegistrationOutcome::TransientFailure`].
    async fn register(&self, request: &RegistrationRequest) -> RegistrationOutcome;
}

#[async_trait]
impl<T: ProvenanceApi + ?Sized> ProvenanceApi for std::sync::Arc<T> {
    async fn register(&self, request: &RegistrationRequest) -> RegistrationOutcome {
        (**self).register(request).await
    }
}
