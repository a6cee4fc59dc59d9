use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use precedence_api::request::parse_base_url;
use precedence_kafka::KafkaConfig;
use precedence_node::monitor::compile_topic_pattern;
use precedence_node::{PipelineConfig, RetryPolicy};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "PRECEDENCE";

/// Required keys with the environment variable that sets each one.
pub const REQUIRED: [(&str, &str); 4] = [
    ("api", "PRECEDENCE_API"),
    ("application_id", "PRECEDENCE_APPLICATION_ID"),
    ("bootstrap_servers", "PRECEDENCE_BOOTSTRAP_SERVERS"),
    ("input_topic_pattern", "PRECEDENCE_INPUT_TOPIC_PATTERN"),
];

#[derive(Debug, Error)]
pub enum RelayConfigError {
    /// Holds the environment variable names of the missing keys.
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Source(#[from] ConfigError),
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    Fixed,
    Exponential,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    pub api: String,
    pub application_id: String,
    pub bootstrap_servers: String,
    pub input_topic_pattern: String,
    #[serde(deserialize_with = "store_flag")]
    pub store: bool,
    #[serde(with = "humantime_serde")]
    pub refresh_topics_interval: Duration,
    pub retry_strategy: RetryStrategy,
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub retry_max_delay: Duration,
    #[serde(default, with = "humantime_serde")]
    pub api_timeout: Option<Duration>,
    pub auto_offset_reset: String,
    #[serde(with = "humantime_serde")]
    pub metadata_timeout: Duration,
    pub health_bind: String,
    pub health_port: u16,
}

/// `store` is on only for the literal `true`; any other value leaves it off.
fn store_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct StoreFlag;

    impl<'de> Visitor<'de> for StoreFlag {
        type Value = bool;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a store flag")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            Ok(v == "true")
        }

        fn visit_i64<E: de::Error>(self, _: i64) -> Result<bool, E> {
            Ok(false)
        }

        fn visit_u64<E: de::Error>(self, _: u64) -> Result<bool, E> {
            Ok(false)
        }

        fn visit_f64<E: de::Error>(self, _: f64) -> Result<bool, E> {
            Ok(false)
        }

        fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }
    }

    deserializer.deserialize_any(StoreFlag)
}

impl RelayConfig {
    /// Defaults, then the optional file, then `PRECEDENCE_*` variables.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, RelayConfigError> {
        let mut builder = Config::builder()
            .set_default("store", false)?
            .set_default("refresh_topics_interval", "60s")?
            .set_default("retry_strategy", "fixed")?
            .set_default("retry_delay", "1s")?
            .set_default("retry_max_delay", "30s")?
            .set_default("auto_offset_reset", "earliest")?
            .set_default("metadata_timeout", "10s")?
            .set_default("health_bind", "127.0.0.1")?
            .set_default("health_port", 0)?;

        if let Some(path) = config_path {
            if path.extension().and_then(|ext| ext.to_str()) == Some("env") {
                // .env files feed the environment source below
                match dotenvy::from_path(&path) {
                    Ok(_) => tracing::info!("loaded environment from {}", path.display()),
                    Err(err) => {
                        tracing::warn!("failed to load .env from {}: {}", path.display(), err)
                    }
                }
            } else {
                builder = builder.add_source(File::from(path));
            }
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        let built = builder.build()?;

        let missing: Vec<&'static str> = REQUIRED
            .iter()
            .filter(|(key, _)| {
                built
                    .get_string(key)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .map(|(_, env)| *env)
            .collect();
        if !missing.is_empty() {
            return Err(RelayConfigError::Missing(missing));
        }

        let cfg: RelayConfig = built.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), RelayConfigError> {
        parse_base_url(&self.api).map_err(|e| RelayConfigError::Invalid(e.to_string()))?;
        compile_topic_pattern(&self.input_topic_pattern)
            .map_err(|e| RelayConfigError::Invalid(e.to_string()))?;
        if self.refresh_topics_interval.is_zero() {
            return Err(RelayConfigError::Invalid(
                "refresh_topics_interval must be positive".to_string(),
            ));
        }
        if !matches!(self.auto_offset_reset.as_str(), "earliest" | "latest") {
            return Err(RelayConfigError::Invalid(format!(
                "auto_offset_reset must be `earliest` or `latest`, got `{}`",
                self.auto_offset_reset
            )));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match self.retry_strategy {
            RetryStrategy::Fixed => RetryPolicy::Fixed {
                delay: self.retry_delay,
            },
            RetryStrategy::Exponential => RetryPolicy::Exponential {
                base: self.retry_delay,
                max: self.retry_max_delay,
            },
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            store: self.store,
            retry: self.retry_policy(),
        }
    }

    pub fn kafka_config(&self) -> KafkaConfig {
        KafkaConfig {
            bootstrap_servers: self.bootstrap_servers.clone(),
            group_id: self.application_id.clone(),
            auto_offset_reset: self.auto_offset_reset.clone(),
            metadata_timeout: self.metadata_timeout,
        }
    }
}
