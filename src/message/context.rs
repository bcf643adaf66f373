//! Per-message processing context.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::CONTENT_TYPE_KEY;
use crate::message::types::InboundMessage;
use crate::signal::parse_flag;

/// Property a pipeline sets to request a rollback.
pub const SET_ROLLBACK_ONLY: &str = "SET_ROLLBACK_ONLY";

/// Property a pipeline sets, alongside a rollback, to request redelivery.
pub const SET_REQUEUE_ON_ROLLBACK: &str = "SET_REQUEUE_ON_ROLLBACK";

/// Mutable signal bag threaded through the pipeline for one message.
///
/// Owns the [`InboundMessage`]; the message itself stays read-only.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    message: InboundMessage,
    properties: HashMap<String, Value>,
}

impl ProcessingContext {
    /// Fresh context with no properties set.
    pub fn new(message: InboundMessage) -> Self {
        Self {
            message,
            properties: HashMap::new(),
        }
    }

    pub fn message(&self) -> &InboundMessage {
        &self.message
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        self.properties.remove(key)
    }

    pub fn has_properties(&self) -> bool {
        !self.properties.is_empty()
    }

    /// Request a rollback and say whether the broker should redeliver.
    pub fn request_rollback(&mut self, requeue: bool) {
        self.set_property(SET_ROLLBACK_ONLY, true);
        self.set_property(SET_REQUEUE_ON_ROLLBACK, requeue);
    }

    pub fn rollback_requested(&self) -> bool {
        parse_flag(self.property(SET_ROLLBACK_ONLY))
    }

    pub fn requeue_on_rollback(&self) -> bool {
        parse_flag(self.property(SET_REQUEUE_ON_ROLLBACK))
    }

    /// Endpoint-configured content type recorded at build time.
    pub fn content_type_override(&self) -> Option<&str> {
        self.property(CONTENT_TYPE_KEY).and_then(Value::as_str)
    }
}
