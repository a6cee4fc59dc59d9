//! Scripted provenance service for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use precedence_core::RegistrationOutcome;

use crate::request::RegistrationRequest;
use crate::ProvenanceApi;

#[derive(Debug, Default)]
struct Script {
    outcomes: VecDeque<RegistrationOutcome>,
    requests: Vec<RegistrationRequest>,
}

/// Replays queued outcomes in order, then answers `Created` with a
/// sequential provable id. Clones share the same script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvenanceApi {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedProvenanceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = RegistrationOutcome>,
    {
        let api = Self::new();
        api.lock().outcomes.extend(outcomes);
        api
    }

    pub fn push_outcome(&self, outcome: RegistrationOutcome) {
        self.lock().outcomes.push_back(outcome);
    }

    /// Every request received so far, retries included.
    pub fn requests(&self) -> Vec<RegistrationRequest> {
        self.lock().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProvenanceApi for ScriptedProvenanceApi {
    async fn register(&self, request: &RegistrationRequest) -> RegistrationOutcome {
        let mut script = self.lock();
        script.requests.push(request.clone());
        let n = script.requests.len();
        script
            .outcomes
            .pop_front()
            .unwrap_or_else(|| RegistrationOutcome::Created {
                provable_id: format!("provable-{n}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use precedence_core::RegistrationOutcome;

    use super::ScriptedProvenanceApi;
    use crate::request::RegistrationRequest;
    use crate::ProvenanceApi;

    fn request(id: &str) -> RegistrationRequest {
        RegistrationRequest {
            id: id.to_string(),
            chain: "c".to_string(),
            store: false,
            hash: String::new(),
            body: b"null".to_vec(),
        }
    }

    #[tokio::test]
    async fn replays_script_then_creates() {
        let api = ScriptedProvenanceApi::with_outcomes([RegistrationOutcome::transient("down")]);
        assert!(!api.register(&request("a")).await.is_terminal());
        assert_eq!(
            api.register(&request("a")).await,
            RegistrationOutcome::Created {
                provable_id: "provable-2".to_string()
            }
        );
        let clone = api.clone();
        clone.register(&request("b")).await;
        assert_eq!(api.call_count(), 3);
        assert_eq!(api.requests()[2].id, "b");
    }
}
