use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use precedence_api::HttpProvenanceClient;
use precedence_kafka::{KafkaSubscriber, KafkaTopicLister};
use precedence_node::{BrokerPipelineLauncher, RelayMetrics, TopicMonitor};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod config;
mod http_server;
mod inspect;
mod logger;

use crate::config::{RelayConfig, RelayConfigError, REQUIRED};
use crate::logger::{LogBuffer, LogBufferLayer};

const LOG_BUFFER_SIZE: usize = 1000;
const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (.toml, .json, ... or .env)
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay (default)
    Run,
    /// Decode a key/value envelope pair and print the registration it yields
    Inspect {
        /// File holding the record key JSON
        #[arg(long)]
        key: PathBuf,
        /// File holding the record value JSON; omit for a tombstone
        #[arg(long)]
        value: Option<PathBuf>,
        /// Provenance API base URL used to render the request URL
        #[arg(long, env = "PRECEDENCE_API", default_value = "http://localhost:8080")]
        api: String,
        /// Value of the `store` query parameter
        #[arg(long)]
        store: bool,
    },
}

fn init_tracing(log_buffer: &Arc<LogBuffer>) {
    let filter = std::env::var("PRECEDENCE_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(LogBufferLayer {
            buffer: Arc::clone(log_buffer),
        })
        .init();
}

fn print_required_configuration(missing: &[&str]) {
    eprintln!("Missing required configuration. Set the following environment variables:");
    for (_, env) in REQUIRED {
        let marker = if missing.contains(&env) { " (missing)" } else { "" };
        eprintln!("  {env}{marker}");
    }
}

#[tokio::main]
async fn main() {
    let log_buffer = Arc::new(LogBuffer::new(LOG_BUFFER_SIZE));
    init_tracing(&log_buffer);

    let cli = Cli::parse();

    if let Some(Commands::Inspect {
        key,
        value,
        api,
        store,
    }) = &cli.command
    {
        match inspect::inspect_files(key, value.as_deref(), api, *store) {
            Ok(inspection) => match serde_json::to_string_pretty(&inspection) {
                Ok(text) => println!("{text}"),
                Err(err) => {
                    error!("failed to render inspection: {err}");
                    std::process::exit(1);
                }
            },
            Err(err) => {
                error!("{err}");
                std::process::exit(1);
            }
        }
        return;
    }

    let config = match RelayConfig::load(cli.config) {
        Ok(cfg) => cfg,
        Err(RelayConfigError::Missing(missing)) => {
            print_required_configuration(&missing);
            std::process::exit(1);
        }
        Err(err) => {
            error!("failed to load config: {err}");
            std::process::exit(1);
        }
    };

    std::process::exit(run(config, log_buffer).await);
}

async fn run(config: RelayConfig, log_buffer: Arc<LogBuffer>) -> i32 {
    info!(
        "precedence-debezium {} starting: api={} application_id={} bootstrap_servers={} pattern={} store={} refresh={:?} retry={:?}",
        env!("CARGO_PKG_VERSION"),
        config.api,
        config.application_id,
        config.bootstrap_servers,
        config.input_topic_pattern,
        config.store,
        config.refresh_topics_interval,
        config.retry_policy(),
    );

    let metrics = Arc::new(RelayMetrics::default());
    let shutdown = Arc::new(AtomicBool::new(false));
    let _ = flag::register(SIGTERM, Arc::clone(&shutdown));
    let _ = flag::register(SIGINT, Arc::clone(&shutdown));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
                return;
            }
            tokio::time::sleep(SIGNAL_POLL_INTERVAL).await;
        }
    });

    let client = match HttpProvenanceClient::new(&config.api, config.api_timeout) {
        Ok(client) => client,
        Err(err) => {
            error!("provenance client init failed: {err}");
            return 1;
        }
    };
    let kafka = config.kafka_config();
    let lister = match KafkaTopicLister::connect(&kafka) {
        Ok(lister) => lister,
        Err(err) => {
            error!("kafka admin client init failed: {err}");
            return 1;
        }
    };
    let launcher = BrokerPipelineLauncher::new(
        KafkaSubscriber::new(kafka),
        Arc::new(client),
        config.pipeline_config(),
        Arc::clone(&metrics),
    );
    let mut monitor = match TopicMonitor::new(lister, launcher, &config.input_topic_pattern) {
        Ok(monitor) => monitor,
        Err(err) => {
            error!("{err}");
            return 1;
        }
    };

    if config.health_port != 0 {
        let state = http_server::HealthState {
            metrics: Arc::clone(&metrics),
            log_buffer,
        };
        let bind_addr = format!("{}:{}", config.health_bind, config.health_port);
        match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => {
                info!("health server listening on {bind_addr}");
                let router = http_server::build_router(state);
                tokio::spawn(async move {
                    if let Err(err) = axum::serve(listener, router).await {
                        error!("health server error: {err}");
                    }
                });
            }
            Err(err) => warn!("health server bind failed on {bind_addr}: {err}"),
        }
    }

    match monitor
        .run(config.refresh_topics_interval, shutdown_rx)
        .await
    {
        Ok(()) => {
            let snapshot = metrics.snapshot();
            info!(
                "shutdown complete: created={} conflicts={} decode_failures={} tombstones={}",
                snapshot.created, snapshot.conflicts, snapshot.decode_failures, snapshot.tombstones
            );
            0
        }
        Err(err) => {
            error!("topic monitor stopped: {err}");
            1
        }
    }
}
