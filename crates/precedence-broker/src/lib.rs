//! Broker abstractions for precedence.
//!
//! The pipeline and topic monitor only depend on the topic-listing and
//! record-stream traits defined in this crate.

pub mod broker;
pub mod memory;

pub use broker::{BrokerError, BrokerRecord, RecordStream, Subscriber, TopicLister};
