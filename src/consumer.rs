//! Per-channel consumer worker.
//!
//! Pulls deliveries off an in-process queue strictly in order, runs each
//! through the [`DeliveryBridge`], and settles it on the broker channel via an
//! [`Acknowledger`]. One worker per channel; workers may share a bridge.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::{AckDirective, DeliveryBridge};
use crate::error::ChannelError;
use crate::message::TransportMetadata;

/// One broker delivery waiting to be processed.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub metadata: TransportMetadata,
    pub payload: Vec<u8>,
}

impl Delivery {
    pub fn new(metadata: TransportMetadata, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            metadata,
            payload: payload.into(),
        }
    }
}

/// Performs the broker-side ack / reject for a settled delivery.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn settle(&self, delivery_tag: u64, directive: AckDirective)
    -> Result<(), ChannelError>;
}

/// Directive counters for one worker.
#[derive(Debug, Default)]
pub struct ConsumerStats {
    acknowledged: AtomicU64,
    requeued: AtomicU64,
    discarded: AtomicU64,
    settle_failures: AtomicU64,
}

/// Point-in-time copy of [`ConsumerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub acknowledged: u64,
    pub requeued: u64,
    pub discarded: u64,
    pub settle_failures: u64,
}

impl ConsumerStats {
    fn record(&self, directive: AckDirective) {
        let counter = match directive {
            AckDirective::Acknowledge => &self.acknowledged,
            AckDirective::RejectRequeue => &self.requeued,
            AckDirective::RejectDiscard => &self.discarded,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            acknowledged: self.acknowledged.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            settle_failures: self.settle_failures.load(Ordering::Relaxed),
        }
    }
}

/// Handle to a running consumer worker.
pub struct ConsumerHandle {
    pub join: JoinHandle<()>,
    /// Cancel to stop the worker. A delivery already in progress is still
    /// settled; nothing further is taken off the queue.
    pub shutdown: CancellationToken,
    pub stats: Arc<ConsumerStats>,
}

/// Spawn a worker that drains `deliveries` until the sender closes or
/// shutdown is requested.
///
/// Settle failures are logged and counted; they never stop the loop.
pub fn spawn_consumer(
    name: impl Into<String>,
    bridge: Arc<DeliveryBridge>,
    mut deliveries: mpsc::Receiver<Delivery>,
    acknowledger: Arc<dyn Acknowledger>,
) -> ConsumerHandle {
    let name = name.into();
    let shutdown = CancellationToken::new();
    let worker_shutdown = shutdown.clone();
    let stats = Arc::new(ConsumerStats::default());
    let worker_stats = Arc::clone(&stats);

    let join = tokio::spawn(async move {
        info!(consumer = %name, "Consumer started");

        loop {
            let delivery = tokio::select! {
                biased;
                _ = worker_shutdown.cancelled() => {
                    info!(consumer = %name, "Consumer shutting down");
                    return;
                }
                next = deliveries.recv() => match next {
                    Some(delivery) => delivery,
                    None => break,
                },
            };

            let tag = delivery.metadata.delivery_tag;
            let directive = bridge.deliver(&delivery.metadata, &delivery.payload).await;
            worker_stats.record(directive);

            match acknowledger.settle(tag, directive).await {
                Ok(()) => debug!(
                    consumer = %name,
                    delivery_tag = tag,
                    directive = directive.label(),
                    "Delivery settled"
                ),
                Err(e) => {
                    worker_stats.settle_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        consumer = %name,
                        delivery_tag = tag,
                        error = %e,
                        "Failed to settle delivery"
                    );
                }
            }
        }

        info!(consumer = %name, "Delivery queue closed, consumer stopped");
    });

    ConsumerHandle {
        join,
        shutdown,
        stats,
    }
}
