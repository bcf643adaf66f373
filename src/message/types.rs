//! Transport metadata and the normalized inbound message.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header key exposing the correlation id in [`TransportHeaders`].
pub const CORRELATION_ID_HEADER: &str = "rabbitmq.message.correlation.id";

/// Header key exposing the message id in [`TransportHeaders`].
pub const MESSAGE_ID_HEADER: &str = "rabbitmq.message.id";

/// Header carrying the operation identity.
pub const SOAP_ACTION_HEADER: &str = "SOAP_ACTION";

/// Flattened string headers handed to the pipeline.
pub type TransportHeaders = BTreeMap<String, String>;

// ── Transport metadata ──────────────────────────────────────────────

/// Raw per-delivery metadata as handed over by the broker consumer.
///
/// Everything except the delivery tag is optional; the builder degrades
/// missing fields to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportMetadata {
    /// Broker-assigned delivery identifier, unique per channel.
    pub delivery_tag: u64,
    /// Content type property, possibly with parameters (`text/plain; charset=utf-8`).
    pub content_type: Option<String>,
    /// Content encoding property.
    pub content_encoding: Option<String>,
    /// Application headers. Values keep the broker's dynamic typing.
    pub headers: Option<BTreeMap<String, serde_json::Value>>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub message_id: Option<String>,
    /// Message type property, used as the operation identity fallback.
    pub message_type: Option<String>,
    /// Whether the broker has delivered this message before.
    #[serde(default)]
    pub redelivered: bool,
}

impl TransportMetadata {
    /// Metadata with only a delivery tag set.
    pub fn new(delivery_tag: u64) -> Self {
        Self {
            delivery_tag,
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }
}

// ── Inbound message ─────────────────────────────────────────────────

/// Normalized, immutable view of one broker delivery.
///
/// Built once by `MessageContextBuilder`; fields are private so nothing can
/// mutate it after construction.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub(crate) delivery_tag: u64,
    pub(crate) content_type: String,
    pub(crate) charset: Option<String>,
    pub(crate) headers: TransportHeaders,
    pub(crate) correlation_id: Option<String>,
    pub(crate) reply_to: Option<String>,
    pub(crate) message_id: String,
    pub(crate) operation: Option<String>,
    pub(crate) redelivered: bool,
    pub(crate) received_at: DateTime<Utc>,
    pub(crate) body: Vec<u8>,
}

impl InboundMessage {
    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    /// Resolved media type, lower-cased and without parameters.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn headers(&self) -> &TransportHeaders {
        &self.headers
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    /// Broker message id, or a generated UUID when the broker sent none.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn redelivered(&self) -> bool {
        self.redelivered
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_builders_fill_fields() {
        let meta = TransportMetadata::new(9)
            .with_content_type("application/json")
            .with_header("x-retry", 2)
            .with_correlation_id("corr-1")
            .with_reply_to("replies");

        assert_eq!(meta.delivery_tag, 9);
        assert_eq!(meta.content_type.as_deref(), Some("application/json"));
        assert_eq!(meta.headers.as_ref().unwrap()["x-retry"], 2);
        assert_eq!(meta.correlation_id.as_deref(), Some("corr-1"));
        assert_eq!(meta.reply_to.as_deref(), Some("replies"));
        assert!(!meta.redelivered);
    }

    #[test]
    fn metadata_deserializes_with_missing_fields() {
        let meta: TransportMetadata = serde_json::from_str(r#"{"delivery_tag": 3}"#).unwrap();
        assert_eq!(meta, TransportMetadata::new(3));
    }
}
