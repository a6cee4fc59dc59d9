use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use precedence_core::TopicSet;

use crate::broker::{BrokerError, BrokerRecord, RecordStream, Subscriber, TopicLister};

#[derive(Debug, Default)]
struct BrokerLog {
    partitions: BTreeMap<String, BTreeMap<i32, Vec<BrokerRecord>>>,
    committed: HashMap<(String, i32), i64>,
    subscriptions: Vec<TopicSet>,
    open_streams: usize,
}

/// In-memory partitioned log for tests and simulations.
///
/// Streams snapshot the log at subscribe time, starting from the committed
/// position of each partition, and report [`BrokerError::Closed`] once
/// drained.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    log: Arc<Mutex<BrokerLog>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BrokerLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Creates an empty topic so it shows up in listings.
    pub fn create_topic(&self, topic: impl Into<String>) {
        self.lock().partitions.entry(topic.into()).or_default();
    }

    /// Appends a record and returns its offset within the partition.
    pub fn produce(
        &self,
        topic: &str,
        partition: i32,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
    ) -> i64 {
        let mut log = self.lock();
        let records = log
            .partitions
            .entry(topic.to_string())
            .or_default()
            .entry(partition)
            .or_default();
        let offset = records.len() as i64;
        records.push(BrokerRecord {
            topic: topic.to_string(),
            partition,
            offset,
            key: key.map(<[u8]>::to_vec),
            value: value.map(<[u8]>::to_vec),
        });
        offset
    }

    /// Next offset to be consumed for a partition, if anything was committed.
    pub fn committed_offset(&self, topic: &str, partition: i32) -> Option<i64> {
        self.lock()
            .committed
            .get(&(topic.to_string(), partition))
            .copied()
    }

    /// Number of streams subscribed and not yet closed.
    pub fn open_streams(&self) -> usize {
        self.lock().open_streams
    }

    /// Every topic set subscribed so far, in order.
    pub fn subscriptions(&self) -> Vec<TopicSet> {
        self.lock().subscriptions.clone()
    }
}

#[async_trait]
impl TopicLister for InMemoryBroker {
    async fn list_topics(&mut self) -> Result<Vec<String>, BrokerError> {
        Ok(self.lock().partitions.keys().cloned().collect())
    }
}

impl Subscriber for InMemoryBroker {
    type Stream = InMemoryRecordStream;

    fn subscribe(&self, topics: &TopicSet) -> Result<Self::Stream, BrokerError> {
        let mut log = self.lock();
        let mut pending = VecDeque::new();
        for topic in topics.iter() {
            let Some(partitions) = log.partitions.get(topic) else {
                continue;
            };
            for (partition, records) in partitions {
                let start = log
                    .committed
                    .get(&(topic.to_string(), *partition))
                    .copied()
                    .unwrap_or(0)
                    .max(0) as usize;
                pending.extend(records.iter().skip(start).cloned());
            }
        }
        log.subscriptions.push(topics.clone());
        log.open_streams += 1;
        Ok(InMemoryRecordStream {
            pending,
            log: Arc::clone(&self.log),
            closed: false,
        })
    }
}

#[derive(Debug)]
pub struct InMemoryRecordStream {
    pending: VecDeque<BrokerRecord>,
    log: Arc<Mutex<BrokerLog>>,
    closed: bool,
}

#[async_trait]
impl RecordStream for InMemoryRecordStream {
    async fn next_record(&mut self) -> Result<BrokerRecord, BrokerError> {
        if self.closed {
            return Err(BrokerError::Closed);
        }
        self.pending.pop_front().ok_or(BrokerError::Closed)
    }

    fn mark_processed(&mut self, record: &BrokerRecord) -> Result<(), BrokerError> {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.committed
            .insert((record.topic.clone(), record.partition), record.offset + 1);
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.open_streams = log.open_streams.saturating_sub(1);
    }
}

impl Drop for InMemoryRecordStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Topic lister replaying a fixed script of listings.
///
/// Once the script is exhausted the last successful listing repeats.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTopicLister {
    script: VecDeque<Result<Vec<String>, BrokerError>>,
    last: Vec<String>,
    calls: usize,
}

impl ScriptedTopicLister {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Result<Vec<String>, BrokerError>>,
    {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Builds a script of successful listings from string slices.
    pub fn from_listings(listings: &[&[&str]]) -> Self {
        Self::new(listings.iter().map(|topics| {
            Ok(topics.iter().map(|t| t.to_string()).collect::<Vec<_>>())
        }))
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

#[async_trait]
impl TopicLister for ScriptedTopicLister {
    async fn list_topics(&mut self) -> Result<Vec<String>, BrokerError> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(Ok(topics)) => {
                self.last = topics.clone();
                Ok(topics)
            }
            Some(Err(err)) => Err(err),
            None => Ok(self.last.clone()),
        }
    }
}
