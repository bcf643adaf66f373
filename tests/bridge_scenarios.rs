//! End-to-end delivery scenarios through the public API.
//!
//! Each test builds a `DeliveryBridge` around a stub pipeline and checks the
//! directive the broker consumer would receive.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;

use delivery_bridge::config::{BridgeConfig, CONTENT_TYPE_KEY, EndpointProperties};
use delivery_bridge::consumer::{Acknowledger, Delivery, spawn_consumer};
use delivery_bridge::error::{ChannelError, ProcessingFailure};
use delivery_bridge::message::{SET_REQUEUE_ON_ROLLBACK, SET_ROLLBACK_ONLY, TransportHeaders};
use delivery_bridge::{AckDirective, DeliveryBridge, MessagePipeline, ProcessingContext, TransportMetadata};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// What the stub pipeline does with every message.
#[derive(Clone, Copy)]
enum Outcome {
    Succeed,
    Rollback,
    RollbackRequeue,
    RequeueOnly,
    Fail,
}

/// Stub pipeline with fixed behavior and a call counter.
struct StubPipeline {
    outcome: Outcome,
    calls: AtomicUsize,
}

impl StubPipeline {
    fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MessagePipeline for StubPipeline {
    fn name(&self) -> &str {
        "stub"
    }

    async fn handle(
        &self,
        ctx: &mut ProcessingContext,
        _headers: &TransportHeaders,
        _operation: Option<&str>,
        _content_type: &str,
    ) -> Result<(), ProcessingFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            Outcome::Succeed => {}
            Outcome::Rollback => ctx.set_property(SET_ROLLBACK_ONLY, "true"),
            Outcome::RollbackRequeue => {
                ctx.set_property(SET_ROLLBACK_ONLY, "true");
                ctx.set_property(SET_REQUEUE_ON_ROLLBACK, "true");
            }
            Outcome::RequeueOnly => ctx.set_property(SET_REQUEUE_ON_ROLLBACK, true),
            Outcome::Fail => {
                ctx.set_property(SET_ROLLBACK_ONLY, true);
                ctx.set_property(SET_REQUEUE_ON_ROLLBACK, true);
                return Err(anyhow::anyhow!("downstream service unavailable").into());
            }
        }
        Ok(())
    }
}

fn text_plain() -> TransportMetadata {
    TransportMetadata::new(1).with_content_type("text/plain")
}

async fn deliver(outcome: Outcome) -> AckDirective {
    let bridge = DeliveryBridge::new(BridgeConfig::default(), StubPipeline::new(outcome));
    timeout(TEST_TIMEOUT, bridge.deliver(&text_plain(), b"hello"))
        .await
        .unwrap()
}

#[tokio::test]
async fn plain_text_without_signals_is_acknowledged() {
    assert_eq!(deliver(Outcome::Succeed).await, AckDirective::Acknowledge);
}

#[tokio::test]
async fn rollback_and_requeue_strings_requeue() {
    assert_eq!(
        deliver(Outcome::RollbackRequeue).await,
        AckDirective::RejectRequeue
    );
}

#[tokio::test]
async fn rollback_alone_discards() {
    assert_eq!(deliver(Outcome::Rollback).await, AckDirective::RejectDiscard);
}

#[tokio::test]
async fn requeue_without_rollback_acknowledges() {
    assert_eq!(deliver(Outcome::RequeueOnly).await, AckDirective::Acknowledge);
}

#[tokio::test]
async fn processing_failure_discards() {
    assert_eq!(deliver(Outcome::Fail).await, AckDirective::RejectDiscard);
}

#[tokio::test]
async fn malformed_override_payload_never_reaches_pipeline() {
    let pipeline = StubPipeline::new(Outcome::Succeed);
    let bridge = DeliveryBridge::new(BridgeConfig::default(), pipeline.clone())
        .with_config_source(Arc::new(
            EndpointProperties::new().with(CONTENT_TYPE_KEY, "application/json"),
        ));

    let directive = bridge.deliver(&text_plain(), b"hello").await;
    assert_eq!(directive, AckDirective::RejectDiscard);
    assert_eq!(pipeline.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn same_input_same_directive() {
    let pipeline = StubPipeline::new(Outcome::Rollback);
    let bridge = DeliveryBridge::new(BridgeConfig::default(), pipeline.clone());

    let first = bridge.deliver(&text_plain(), b"hello").await;
    let second = bridge.deliver(&text_plain(), b"hello").await;
    assert_eq!(first, second);
    assert_eq!(pipeline.calls.load(Ordering::SeqCst), 2);
}

// ── Consumer loop ───────────────────────────────────────────────────

#[derive(Default)]
struct RecordingAcker {
    settled: Mutex<Vec<(u64, Option<bool>)>>,
}

#[async_trait]
impl Acknowledger for RecordingAcker {
    async fn settle(&self, delivery_tag: u64, directive: AckDirective) -> Result<(), ChannelError> {
        self.settled
            .lock()
            .await
            .push((delivery_tag, directive.requeue()));
        Ok(())
    }
}

#[tokio::test]
async fn workers_share_one_bridge() {
    let bridge = Arc::new(DeliveryBridge::new(
        BridgeConfig::default(),
        StubPipeline::new(Outcome::RollbackRequeue),
    ));

    let mut handles = Vec::new();
    let mut ackers = Vec::new();
    for channel in 0..3u64 {
        let (tx, rx) = mpsc::channel(4);
        let acker = Arc::new(RecordingAcker::default());
        handles.push(spawn_consumer(
            format!("channel-{channel}"),
            Arc::clone(&bridge),
            rx,
            acker.clone(),
        ));
        ackers.push(acker);

        for tag in 1..=3 {
            let meta = TransportMetadata::new(tag).with_content_type("text/plain");
            tx.send(Delivery::new(meta, "payload")).await.unwrap();
        }
    }

    for handle in handles {
        timeout(TEST_TIMEOUT, handle.join).await.unwrap().unwrap();
    }

    for acker in ackers {
        let settled = acker.settled.lock().await.clone();
        assert_eq!(settled, vec![(1, Some(true)), (2, Some(true)), (3, Some(true))]);
    }
}
