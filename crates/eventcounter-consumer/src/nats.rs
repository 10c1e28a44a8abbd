//! NATS subscription and message decoding.
//!
//! Producers publish one message per event on `<user_id>.event.<kind>` with
//! a JSON payload `{"id": "<message id>"}`. The consumer subscribes with a
//! wildcard filter and turns each message into a [`Delivery`].

use eventcounter_types::EventKind;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConsumerError;

/// NATS client wrapper for the event consumer.
pub struct NatsClient {
    client: async_nats::Client,
}

impl NatsClient {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, ConsumerError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| ConsumerError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Subscribe to `subject` and expose the messages as deliveries.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Nats`] if the subscription fails.
    pub async fn subscribe(
        &self,
        subject: &str,
    ) -> Result<impl Stream<Item = Delivery> + Unpin + use<>, ConsumerError> {
        debug!(subject = subject, "subscribing to event subjects");
        let subscriber = self
            .client
            .subscribe(subject.to_owned())
            .await
            .map_err(|e| ConsumerError::Nats(format!("failed to subscribe to {subject}: {e}")))?;
        info!(subject = subject, "subscribed to event subjects");
        Ok(subscriber.map(Delivery::from))
    }
}

impl std::fmt::Debug for NatsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsClient")
            .field("connected", &true)
            .finish()
    }
}

/// One message as received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Subject the message was published on.
    pub subject: String,
    /// Raw message body.
    pub payload: Vec<u8>,
}

impl Delivery {
    /// Build a delivery from its parts.
    pub fn new(subject: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
        }
    }
}

impl From<async_nats::Message> for Delivery {
    fn from(message: async_nats::Message) -> Self {
        Self::new(message.subject.to_string(), message.payload.to_vec())
    }
}

/// Body of an event message.
#[derive(Debug, Deserialize)]
pub struct MessagePayload {
    /// Message identifier used for deduplication.
    pub id: String,
}

/// Split `<user_id>.event.<kind>` into its user and kind.
///
/// # Errors
///
/// - [`ConsumerError::InvalidSubject`] if the subject has another shape or
///   an empty user.
/// - [`ConsumerError::Kind`] if the kind segment is not a known kind.
pub fn parse_subject(subject: &str) -> Result<(String, EventKind), ConsumerError> {
    let parts: Vec<&str> = subject.split('.').collect();
    match parts.as_slice() {
        [user_id, "event", kind] if !user_id.is_empty() => {
            let kind: EventKind = kind.parse()?;
            Ok(((*user_id).to_owned(), kind))
        }
        _ => Err(ConsumerError::InvalidSubject(subject.to_owned())),
    }
}

/// Decode a message body.
///
/// # Errors
///
/// Returns [`ConsumerError::Payload`] if the body is not a JSON object with
/// a string `id`.
pub fn decode_payload(data: &[u8]) -> Result<MessagePayload, ConsumerError> {
    Ok(serde_json::from_slice(data)?)
}
