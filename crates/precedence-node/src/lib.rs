//! Forwarding runtime for precedence.
//!
//! - `delivery`: retries one registration until the service resolves it.
//! - `pipeline`: consumes a fixed topic set, decodes and delivers in order.
//! - `monitor`: discovers matching topics and restarts the pipeline when the
//!   set grows.

pub mod config;
pub mod delivery;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod pipeline;

pub use config::{PipelineConfig, RetryPolicy};
pub use error::{MonitorError, PipelineError};
pub use metrics::{MetricsSnapshot, RelayMetrics};
pub use monitor::{TickOutcome, TopicMonitor};
pub use pipeline::{
    BrokerPipelineLauncher, Pipeline, PipelineHandle, PipelineLauncher, RecordDisposition,
    RunningPipeline,
};

use tokio::sync::watch;

/// Resolves once `true` is published or the sender is gone.
pub(crate) async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
