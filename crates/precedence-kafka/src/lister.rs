use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use precedence_broker::{BrokerError, TopicLister};
use rdkafka::consumer::{BaseConsumer, Consumer};
use tokio::task::JoinError;

use crate::config::KafkaConfig;

/// Prefix of broker-internal topics such as `__consumer_offsets`.
const INTERNAL_TOPIC_PREFIX: &str = "__";

/// Lists topics through a metadata request on a dedicated client.
pub struct KafkaTopicLister {
    client: Arc<BaseConsumer>,
    timeout: Duration,
}

impl KafkaTopicLister {
    pub fn connect(config: &KafkaConfig) -> Result<Self, BrokerError> {
        let client: BaseConsumer = config
            .admin_config()
            .create()
            .map_err(|e| BrokerError::ListTopics(format!("admin client: {e}")))?;
        Ok(Self {
            client: Arc::new(client),
            timeout: config.metadata_timeout,
        })
    }
}

pub(crate) fn external_topics<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names
        .into_iter()
        .map(Into::into)
        .filter(|name| !name.starts_with(INTERNAL_TOPIC_PREFIX))
        .collect()
}

fn join_error(e: JoinError) -> BrokerError {
    if e.is_cancelled() {
        BrokerError::Interrupted
    } else {
        BrokerError::ListTopics(format!("metadata task failed: {e}"))
    }
}

#[async_trait]
impl TopicLister for KafkaTopicLister {
    async fn list_topics(&mut self) -> Result<Vec<String>, BrokerError> {
        let client = Arc::clone(&self.client);
        let timeout = self.timeout;
        let names = tokio::task::spawn_blocking(move || {
            client
                .fetch_metadata(None, timeout)
                .map(|metadata| {
                    metadata
                        .topics()
                        .iter()
                        .map(|topic| topic.name().to_string())
                        .collect::<Vec<_>>()
                })
                .map_err(|e| BrokerError::ListTopics(e.to_string()))
        })
        .await
        .map_err(join_error)??;
        Ok(external_topics(names))
    }
}

#[cfg(test)]
mod tests {
    use super::external_topics;

    #[test]
    fn internal_topics_are_hidden() {
        let topics = external_topics([
            "__consumer_offsets",
            "__transaction_state",
            "dbserver.inventory.orders",
            "dbserver_history",
        ]);
        assert_eq!(topics, vec!["dbserver.inventory.orders", "dbserver_history"]);
    }

    #[tokio::test]
    async fn cancelled_metadata_task_counts_as_interrupted() {
        let task = tokio::spawn(std::future::pending::<()>());
        task.abort();
        let err = task.await.expect_err("aborted");
        assert_eq!(super::join_error(err), precedence_broker::BrokerError::Interrupted);
    }
}
