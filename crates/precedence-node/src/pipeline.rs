use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use precedence_api::{ProvenanceApi, RegistrationRequest};
use precedence_broker::{BrokerError, BrokerRecord, RecordStream, Subscriber};
use precedence_codec::envelope::decode_record;
use precedence_core::TopicSet;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::delivery::{deliver, DeliveryReport};
use crate::error::PipelineError;
use crate::metrics::RelayMetrics;
use crate::shutdown_requested;

const CONSUME_ERROR_PAUSE: Duration = Duration::from_secs(1);

/// What happened to one consumed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordDisposition {
    Tombstone,
    /// Malformed envelope; logged and skipped.
    DecodeFailed,
    Delivered(DeliveryReport),
}

/// Consumption loop over one static topic subscription.
///
/// Records are decoded and delivered one at a time in stream order, so a
/// record blocked on retries holds back everything behind it.
pub struct Pipeline<R, A: ?Sized> {
    stream: R,
    api: Arc<A>,
    config: PipelineConfig,
    metrics: Arc<RelayMetrics>,
}

impl<R, A> Pipeline<R, A>
where
    R: RecordStream,
    A: ProvenanceApi + ?Sized,
{
    pub fn new(
        stream: R,
        api: Arc<A>,
        config: PipelineConfig,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            stream,
            api,
            config,
            metrics,
        }
    }

    /// Handles one record to resolution, then marks it processed.
    pub async fn process(&mut self, record: &BrokerRecord) -> RecordDisposition {
        RelayMetrics::bump(&self.metrics.records_seen);
        let disposition = if record.is_tombstone() {
            RelayMetrics::bump(&self.metrics.tombstones);
            debug!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                "skipping tombstone"
            );
            RecordDisposition::Tombstone
        } else {
            let value = record.value.as_deref().unwrap_or_default();
            match self.prepare(record, value) {
                Some(request) => RecordDisposition::Delivered(
                    deliver(&*self.api, &request, self.config.retry, &self.metrics).await,
                ),
                None => {
                    RelayMetrics::bump(&self.metrics.decode_failures);
                    RecordDisposition::DecodeFailed
                }
            }
        };
        if let Err(e) = self.stream.mark_processed(record) {
            warn!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                "failed to store offset: {e}"
            );
        }
        disposition
    }

    fn prepare(&self, record: &BrokerRecord, value: &[u8]) -> Option<RegistrationRequest> {
        let prepared = decode_record(record.key.as_deref(), value)
            .map_err(|e| e.to_string())
            .and_then(|canonical| {
                if canonical.is_delete() {
                    debug!(
                        topic = %record.topic,
                        offset = record.offset,
                        chain = %canonical.chain,
                        "registering delete"
                    );
                }
                RegistrationRequest::from_record(&canonical, self.config.store)
                    .map_err(|e| e.to_string())
            });
        match prepared {
            Ok(request) => Some(request),
            Err(reason) => {
                error!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    key = %key_excerpt(record.key.as_deref()),
                    "failed to decode record: {reason}"
                );
                None
            }
        }
    }

    /// Runs until `shutdown` flips to `true`, then closes the stream.
    ///
    /// An in-flight record is abandoned on shutdown without being marked,
    /// so it is consumed again after restart.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                next = self.stream.next_record() => next,
            };
            match next {
                Ok(record) => {
                    tokio::select! {
                        biased;
                        _ = shutdown_requested(&mut shutdown) => break,
                        _ = self.process(&record) => {}
                    }
                }
                Err(BrokerError::Closed) => {
                    debug!("record stream drained; idling until shutdown");
                    shutdown_requested(&mut shutdown).await;
                    break;
                }
                Err(e) => {
                    warn!("consume failed: {e}");
                    tokio::select! {
                        biased;
                        _ = shutdown_requested(&mut shutdown) => break,
                        _ = tokio::time::sleep(CONSUME_ERROR_PAUSE) => {}
                    }
                }
            }
        }
        self.stream.close();
    }
}

const KEY_EXCERPT_CHARS: usize = 200;

fn key_excerpt(key: Option<&[u8]>) -> String {
    match key {
        Some(bytes) => String::from_utf8_lossy(bytes)
            .chars()
            .take(KEY_EXCERPT_CHARS)
            .collect(),
        None => "<none>".to_string(),
    }
}

/// Stoppable pipeline owned by the topic monitor.
#[async_trait]
pub trait PipelineHandle: Send + Sized {
    /// Stops consuming and waits until the broker connection is released.
    async fn stop(self) -> Result<(), PipelineError>;
}

/// Builds and starts a pipeline over a topic set.
pub trait PipelineLauncher: Send {
    type Handle: PipelineHandle;

    fn launch(&mut self, topics: &TopicSet) -> Result<Self::Handle, PipelineError>;
}

/// A pipeline running on its own tokio task.
#[derive(Debug)]
pub struct RunningPipeline {
    topics: TopicSet,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RunningPipeline {
    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }
}

#[async_trait]
impl PipelineHandle for RunningPipeline {
    async fn stop(self) -> Result<(), PipelineError> {
        let _ = self.shutdown.send(true);
        self.task
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?;
        info!("pipeline stopped on topics {}", self.topics);
        Ok(())
    }
}

/// Launches pipelines from a broker subscriber and a provenance client.
pub struct BrokerPipelineLauncher<S, A: ?Sized> {
    subscriber: S,
    api: Arc<A>,
    config: PipelineConfig,
    metrics: Arc<RelayMetrics>,
}

impl<S, A: ?Sized> BrokerPipelineLauncher<S, A> {
    pub fn new(
        subscriber: S,
        api: Arc<A>,
        config: PipelineConfig,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            subscriber,
            api,
            config,
            metrics,
        }
    }
}

impl<S, A> PipelineLauncher for BrokerPipelineLauncher<S, A>
where
    S: Subscriber,
    A: ProvenanceApi + ?Sized + 'static,
{
    type Handle = RunningPipeline;

    fn launch(&mut self, topics: &TopicSet) -> Result<RunningPipeline, PipelineError> {
        let stream = self
            .subscriber
            .subscribe(topics)
            .map_err(PipelineError::Subscribe)?;
        let (shutdown, rx) = watch::channel(false);
        let pipeline = Pipeline::new(
            stream,
            Arc::clone(&self.api),
            self.config,
            Arc::clone(&self.metrics),
        );
        let task = tokio::spawn(pipeline.run(rx));
        RelayMetrics::bump(&self.metrics.pipeline_starts);
        self.metrics
            .subscribed_topics
            .store(topics.len() as u64, Ordering::Relaxed);
        info!("pipeline started on topics {topics}");
        Ok(RunningPipeline {
            topics: topics.clone(),
            shutdown,
            task,
        })
    }
}
