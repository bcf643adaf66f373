//! Injected logging capability.
//!
//! The bridge never logs through a global; it holds an `Arc<dyn DeliveryLog>`
//! so callers can swap in a capturing implementation.

use tracing::{Level, debug, error, info, trace, warn};

/// Sink for per-delivery log events.
pub trait DeliveryLog: Send + Sync {
    /// Record one event for a delivery.
    fn record(&self, level: Level, delivery_tag: u64, message: &str);
}

/// Default sink: forwards to `tracing` with the delivery tag as a field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl DeliveryLog for TracingLog {
    fn record(&self, level: Level, delivery_tag: u64, message: &str) {
        match level {
            Level::ERROR => error!(delivery_tag, "{message}"),
            Level::WARN => warn!(delivery_tag, "{message}"),
            Level::INFO => info!(delivery_tag, "{message}"),
            Level::DEBUG => debug!(delivery_tag, "{message}"),
            _ => trace!(delivery_tag, "{message}"),
        }
    }
}

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` when unset or invalid.
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(
    default_filter: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .try_init()
}
