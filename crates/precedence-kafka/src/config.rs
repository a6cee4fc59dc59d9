use std::time::Duration;

use rdkafka::ClientConfig;

/// Connection settings shared by the topic lister and the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    /// Consumer group id; also the checkpoint identity.
    pub group_id: String,
    /// `earliest` or `latest`, used when the group has no committed offset.
    pub auto_offset_reset: String,
    pub metadata_timeout: Duration,
}

impl KafkaConfig {
    pub fn new(bootstrap_servers: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            group_id: group_id.into(),
            auto_offset_reset: "earliest".to_string(),
            metadata_timeout: Duration::from_secs(10),
        }
    }

    /// Consumer settings: offsets are stored explicitly once a record is
    /// resolved and committed in the background.
    pub fn consumer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", &self.auto_offset_reset)
            .set("enable.partition.eof", "false");
        config
    }

    /// Metadata-only client; never joins the group.
    pub fn admin_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("group.id", format!("{}-admin", self.group_id))
            .set("enable.auto.commit", "false");
        config
    }
}
