//! rdkafka adapters for the precedence broker traits.

pub mod config;
pub mod lister;
pub mod stream;

pub use config::KafkaConfig;
pub use lister::KafkaTopicLister;
pub use stream::{KafkaRecordStream, KafkaSubscriber};
