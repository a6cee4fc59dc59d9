use async_trait::async_trait;
use precedence_core::TopicSet;
use thiserror::Error;

/// One key/value record as delivered by the broker for a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    /// `None` marks a tombstone.
    pub value: Option<Vec<u8>>,
}

impl BrokerRecord {
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// The call was interrupted before completing; callers may retry later.
    #[error("operation interrupted")]
    Interrupted,
    #[error("topic listing failed: {0}")]
    ListTopics(String),
    #[error("subscribe failed: {0}")]
    Subscribe(String),
    #[error("consume failed: {0}")]
    Consume(String),
    #[error("offset store failed: {0}")]
    OffsetStore(String),
    /// The stream has no further records and never will.
    #[error("record stream closed")]
    Closed,
}

/// Administrative topic listing.
#[async_trait]
pub trait TopicLister: Send {
    /// Returns every topic name known to the broker.
    async fn list_topics(&mut self) -> Result<Vec<String>, BrokerError>;
}

/// Ordered record source over one static topic subscription.
#[async_trait]
pub trait RecordStream: Send {
    /// Waits for the next record. Records of one partition arrive in offset
    /// order.
    async fn next_record(&mut self) -> Result<BrokerRecord, BrokerError>;

    /// Marks `record` as fully handled so its position may be committed.
    fn mark_processed(&mut self, record: &BrokerRecord) -> Result<(), BrokerError>;

    /// Stops consuming. The stream must not be polled afterwards.
    fn close(&mut self);
}

/// Factory for record streams bound to a fixed topic set.
pub trait Subscriber: Send + Sync {
    type Stream: RecordStream + 'static;

    fn subscribe(&self, topics: &TopicSet) -> Result<Self::Stream, BrokerError>;
}
