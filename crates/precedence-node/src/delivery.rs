use precedence_api::{ProvenanceApi, RegistrationOutcome, RegistrationRequest};
use tracing::{info, warn};

use crate::config::RetryPolicy;
use crate::metrics::RelayMetrics;

/// Terminal result of delivering one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempts: u32,
    /// Always `Created` or `Conflict`.
    pub outcome: RegistrationOutcome,
}

/// Registers `request` until the service answers `Created` or `Conflict`.
///
/// Transient failures are logged and retried after `retry.delay_for(n)`
/// with no attempt limit. Cancel by dropping the future.
pub async fn deliver<A>(
    api: &A,
    request: &RegistrationRequest,
    retry: RetryPolicy,
    metrics: &RelayMetrics,
) -> DeliveryReport
where
    A: ProvenanceApi + ?Sized,
{
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        let outcome = api.register(request).await;
        match &outcome {
            RegistrationOutcome::Created { provable_id } => {
                RelayMetrics::bump(&metrics.created);
                info!("CREATED id:{provable_id}({}) chain:{}", request.id, request.chain);
            }
            RegistrationOutcome::Conflict { existing_id } => {
                RelayMetrics::bump(&metrics.conflicts);
                warn!(
                    "CONFLICT id:{}({}) chain:{}",
                    existing_id.as_deref().unwrap_or("unknown"),
                    request.id,
                    request.chain
                );
            }
            RegistrationOutcome::TransientFailure { reason } => {
                RelayMetrics::bump(&metrics.transient_failures);
                let delay = retry.delay_for(attempts);
                warn!(
                    attempt = attempts,
                    "registration of {} chain:{} failed: {reason}; retrying in {delay:?}",
                    request.id,
                    request.chain
                );
                tokio::time::sleep(delay).await;
                continue;
            }
        }
        return DeliveryReport { attempts, outcome };
    }
}
