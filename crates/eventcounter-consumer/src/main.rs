//! Event consumer entry point.
//!
//! Subscribes to classified events on NATS, counts each distinct message
//! once per user and kind, and writes one `<kind>.json` artifact per kind
//! that saw events when it stops.
//!
//! # Architecture
//!
//! ```text
//! NATS (<user>.event.<kind>) --> EventRunner --> EventEngine --> <kind>.json
//! ```
//!
//! The consumer stops on SIGINT/SIGTERM, after `IDLE_TIMEOUT_MS` without a
//! message, or when the subscription ends. It then drains and flushes; a
//! failed flush makes the process exit non-zero.

mod config;
mod error;
mod nats;
mod runner;

use std::sync::Arc;

use eventcounter_core::{EventEngine, JsonFileSink, LoggingConsumer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ConsumerConfig;
use crate::error::ConsumerError;
use crate::nats::NatsClient;
use crate::runner::{shutdown_signal, EventRunner};

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// connects to NATS, then consumes events until a stop condition and
/// flushes the counts.
///
/// # Errors
///
/// Returns an error if initialization fails or the counts cannot be written.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("eventcounter-consumer starting");

    // Load configuration from environment
    let config = ConsumerConfig::from_env()?;
    info!(
        nats_url = config.nats_url,
        subject = config.subject,
        idle_timeout_ms = config.idle_timeout.as_millis(),
        output_dir = %config.output_dir.display(),
        queue_capacity = config.engine.queue_capacity,
        dry_run = config.dry_run,
        "configuration loaded"
    );

    // Connect and subscribe
    let nats = NatsClient::connect(&config.nats_url).await?;
    let deliveries = nats.subscribe(&config.subject).await?;
    let runner = EventRunner::new(config.idle_timeout);

    if config.dry_run {
        info!("dry run, events are logged and not counted");
        runner
            .run(&LoggingConsumer::new(), deliveries, shutdown_signal())
            .await;
        return Ok(());
    }

    let sink = Arc::new(JsonFileSink::new(config.output_dir));
    let engine = EventEngine::new(config.engine, sink)?;

    info!("event engine initialized, entering consume loop");
    runner.run(&engine, deliveries, shutdown_signal()).await;

    engine.begin_shutdown().await.map_err(ConsumerError::from)?;
    Ok(())
}
