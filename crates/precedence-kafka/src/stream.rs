use async_trait::async_trait;
use precedence_broker::{BrokerError, BrokerRecord, RecordStream, Subscriber};
use precedence_core::TopicSet;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use tracing::debug;

use crate::config::KafkaConfig;

/// Creates one group consumer per topic set.
#[derive(Debug, Clone)]
pub struct KafkaSubscriber {
    config: KafkaConfig,
}

impl KafkaSubscriber {
    pub fn new(config: KafkaConfig) -> Self {
        Self { config }
    }
}

impl Subscriber for KafkaSubscriber {
    type Stream = KafkaRecordStream;

    fn subscribe(&self, topics: &TopicSet) -> Result<KafkaRecordStream, BrokerError> {
        let consumer: StreamConsumer = self
            .config
            .consumer_config()
            .create()
            .map_err(|e| BrokerError::Subscribe(format!("consumer create: {e}")))?;
        let names: Vec<&str> = topics.iter().collect();
        consumer
            .subscribe(&names)
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;
        debug!("kafka consumer subscribed to {topics}");
        Ok(KafkaRecordStream {
            consumer: Some(consumer),
        })
    }
}

/// Group consumer over a fixed subscription. Offsets stored through
/// `mark_processed` are committed in the background and once more on close.
pub struct KafkaRecordStream {
    consumer: Option<StreamConsumer>,
}

#[async_trait]
impl RecordStream for KafkaRecordStream {
    async fn next_record(&mut self) -> Result<BrokerRecord, BrokerError> {
        let Some(consumer) = self.consumer.as_ref() else {
            return Err(BrokerError::Closed);
        };
        let message = consumer
            .recv()
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))?;
        Ok(BrokerRecord {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(<[u8]>::to_vec),
            value: message.payload().map(<[u8]>::to_vec),
        })
    }

    fn mark_processed(&mut self, record: &BrokerRecord) -> Result<(), BrokerError> {
        let Some(consumer) = self.consumer.as_ref() else {
            return Err(BrokerError::Closed);
        };
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &record.topic,
            record.partition,
            Offset::Offset(record.offset + 1),
        )
        .map_err(|e| BrokerError::OffsetStore(e.to_string()))?;
        consumer
            .store_offsets(&tpl)
            .map_err(|e| BrokerError::OffsetStore(e.to_string()))
    }

    fn close(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            if let Err(e) = consumer.commit_consumer_state(CommitMode::Sync) {
                debug!("final offset commit skipped: {e}");
            }
            consumer.unsubscribe();
        }
    }
}
