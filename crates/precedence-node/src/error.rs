use precedence_broker::BrokerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline subscribe failed: {0}")]
    Subscribe(#[source] BrokerError),
    #[error("pipeline task failed: {0}")]
    Task(String),
}

/// Failures that stop the topic monitor. Interrupted listings never surface
/// here.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("topic listing failed: {0}")]
    ListTopics(#[source] BrokerError),
    #[error("pipeline start failed: {0}")]
    PipelineStart(#[source] PipelineError),
    #[error("pipeline stop failed: {0}")]
    PipelineStop(#[source] PipelineError),
}
