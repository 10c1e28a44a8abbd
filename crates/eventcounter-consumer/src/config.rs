//! Configuration for the event consumer.
//!
//! All configuration is loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use eventcounter_core::EngineConfig;

use crate::error::ConsumerError;

/// Subject filter matching every user and every kind.
pub const DEFAULT_SUBJECT: &str = "*.event.*";

/// Idle period after which the consumer stops, in milliseconds.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 5000;

/// Complete consumer configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// NATS server URL (e.g. `nats://localhost:4222`).
    pub nats_url: String,
    /// Subject filter to subscribe to.
    pub subject: String,
    /// Stop consuming when no message arrives for this long.
    pub idle_timeout: Duration,
    /// Directory receiving the `<kind>.json` artifacts.
    pub output_dir: PathBuf,
    /// Engine settings.
    pub engine: EngineConfig,
    /// Log events instead of counting them.
    pub dry_run: bool,
}

impl ConsumerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `NATS_URL` -- NATS server connection string
    ///
    /// Optional variables:
    /// - `EVENT_SUBJECT` -- subject filter (default `*.event.*`)
    /// - `IDLE_TIMEOUT_MS` -- idle shutdown in milliseconds (default 5000)
    /// - `OUTPUT_DIR` -- artifact directory (default `.`)
    /// - `QUEUE_CAPACITY` -- per-kind queue capacity (default 100)
    /// - `DRY_RUN` -- log events without counting (default `false`)
    pub fn from_env() -> Result<Self, ConsumerError> {
        let nats_url = env_var("NATS_URL")?;
        let subject = std::env::var("EVENT_SUBJECT").unwrap_or_else(|_| DEFAULT_SUBJECT.to_owned());
        let idle_timeout_ms: u64 = env_or("IDLE_TIMEOUT_MS", DEFAULT_IDLE_TIMEOUT_MS)?;
        let output_dir = std::env::var("OUTPUT_DIR").unwrap_or_else(|_| ".".to_owned());
        let queue_capacity: usize =
            env_or("QUEUE_CAPACITY", eventcounter_core::config::DEFAULT_QUEUE_CAPACITY)?;
        let dry_run: bool = env_or("DRY_RUN", false)?;

        let config = Self {
            nats_url,
            subject,
            idle_timeout: Duration::from_millis(idle_timeout_ms),
            output_dir: PathBuf::from(output_dir),
            engine: EngineConfig { queue_capacity },
            dry_run,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the consumer cannot run with.
    pub fn validate(&self) -> Result<(), ConsumerError> {
        if self.subject.trim().is_empty() {
            return Err(ConsumerError::Config("EVENT_SUBJECT must not be empty".to_owned()));
        }
        if self.idle_timeout.is_zero() {
            return Err(ConsumerError::Config(
                "IDLE_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }
        self.engine.validate()?;
        Ok(())
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, ConsumerError> {
    std::env::var(name)
        .map_err(|e| ConsumerError::Config(format!("missing required env var {name}: {e}")))
}

/// Read and parse an optional environment variable.
fn env_or<T>(name: &str, default: T) -> Result<T, ConsumerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(name).map_or(Ok(default), |raw| parse_value(name, &raw))
}

/// Parse a raw setting, naming the variable on failure.
fn parse_value<T>(name: &str, raw: &str) -> Result<T, ConsumerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConsumerError::Config(format!("invalid {name}: {e}")))
}
