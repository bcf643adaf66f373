//! Delivery outcome bridge — drives one delivery through the pipeline and
//! classifies the result into an [`AckDirective`].
//!
//! **Core invariant: every delivery gets exactly one directive.**
//! `deliver` has no error path; malformed messages, pipeline faults and
//! pipeline panics all end in `RejectDiscard`.
//!
//! Classification order:
//! 1. Pipeline failure → `RejectDiscard`
//! 2. Rollback requested → `RejectRequeue` if requeue-on-rollback, else `RejectDiscard`
//! 3. Otherwise → `Acknowledge`

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::Level;

use crate::bridge::directive::{AckDirective, DeliveryStage};
use crate::config::{BridgeConfig, ConfigSource};
use crate::error::{ConfigError, ProcessingFailure};
use crate::logging::{DeliveryLog, TracingLog};
use crate::message::builder::ContentType;
use crate::message::{MessageContextBuilder, ProcessingContext, TransportMetadata};
use crate::pipeline::MessagePipeline;

/// Bridges broker deliveries to a [`MessagePipeline`].
///
/// Holds no per-message state, so one instance can be shared by several
/// consumer workers.
pub struct DeliveryBridge {
    config: BridgeConfig,
    builder: MessageContextBuilder,
    pipeline: Arc<dyn MessagePipeline>,
    config_source: Option<Arc<dyn ConfigSource>>,
    log: Arc<dyn DeliveryLog>,
}

impl DeliveryBridge {
    /// Create a bridge that logs through `tracing` and has no config source.
    pub fn new(config: BridgeConfig, pipeline: Arc<dyn MessagePipeline>) -> Self {
        let builder = MessageContextBuilder::new(config.default_content_type.clone());
        Self {
            config,
            builder,
            pipeline,
            config_source: None,
            log: Arc::new(TracingLog),
        }
    }

    /// Consult `source` for the content-type override on every delivery.
    pub fn with_config_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.config_source = Some(source);
        self
    }

    /// Replace the log sink.
    pub fn with_log(mut self, log: Arc<dyn DeliveryLog>) -> Self {
        self.log = log;
        self
    }

    /// Process one delivery and decide how the broker must settle it.
    pub async fn deliver(&self, metadata: &TransportMetadata, payload: &[u8]) -> AckDirective {
        let tag = metadata.delivery_tag;
        self.enter(tag, DeliveryStage::Received);

        let override_ct = self.content_type_override(tag);

        let mut ctx = match self.builder.build(metadata, payload, override_ct.as_deref()) {
            Ok(ctx) => ctx,
            Err(e) => {
                self.log.record(
                    Level::ERROR,
                    tag,
                    &format!("Malformed message, discarding: {e}"),
                );
                self.enter(tag, DeliveryStage::Rejected);
                return self.finish(tag, AckDirective::RejectDiscard);
            }
        };
        self.enter(tag, DeliveryStage::ContextBuilt);

        let outcome = self.invoke(&mut ctx).await;
        match &outcome {
            Ok(()) => self.enter(tag, DeliveryStage::Processed),
            Err(e) => {
                self.log.record(
                    Level::ERROR,
                    tag,
                    &format!("Error while processing message: {e}"),
                );
                self.enter(tag, DeliveryStage::Failed);
            }
        }

        self.finish(tag, classify(&outcome, &ctx))
    }

    /// Run the pipeline, converting a panic into a [`ProcessingFailure`].
    async fn invoke(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessingFailure> {
        let message = ctx.message();
        let headers = message.headers().clone();
        let operation = message.operation().map(str::to_string);
        let content_type = message.content_type().to_string();

        AssertUnwindSafe(self.pipeline.handle(
            ctx,
            &headers,
            operation.as_deref(),
            &content_type,
        ))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(ProcessingFailure::Panicked(panic_message(&*panic))))
    }

    /// Read the content-type override. Lookup failures and values that are
    /// not a valid media type are logged and ignored.
    fn content_type_override(&self, tag: u64) -> Option<String> {
        let source = self.config_source.as_ref()?;
        let key = &self.config.content_type_key;
        let checked = source.lookup(key).and_then(|value| match value {
            Some(raw) if !raw.trim().is_empty() => ContentType::parse(&raw)
                .map(|_| Some(raw))
                .map_err(|e| ConfigError::InvalidValue {
                    key: key.clone(),
                    message: e.to_string(),
                }),
            _ => Ok(None),
        });

        match checked {
            Ok(value) => value,
            Err(e) => {
                self.log.record(
                    Level::WARN,
                    tag,
                    &format!("Error while getting content-type override: {e}"),
                );
                None
            }
        }
    }

    fn enter(&self, tag: u64, stage: DeliveryStage) {
        self.log.record(
            Level::TRACE,
            tag,
            &format!(
                "{}/{} stage={}",
                self.config.name,
                self.pipeline.name(),
                stage.label()
            ),
        );
    }

    fn finish(&self, tag: u64, directive: AckDirective) -> AckDirective {
        self.log.record(
            Level::DEBUG,
            tag,
            &format!("Delivery settled as {}", directive.label()),
        );
        directive
    }
}

/// Classify a finished pipeline call.
///
/// `requeue_on_rollback` is only consulted when a rollback was requested.
pub fn classify(outcome: &Result<(), ProcessingFailure>, ctx: &ProcessingContext) -> AckDirective {
    if outcome.is_err() {
        return AckDirective::RejectDiscard;
    }
    if ctx.rollback_requested() {
        return if ctx.requeue_on_rollback() {
            AckDirective::RejectRequeue
        } else {
            AckDirective::RejectDiscard
        };
    }
    AckDirective::Acknowledge
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
