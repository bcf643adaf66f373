//! Downstream processing pipeline boundary.

use async_trait::async_trait;

use crate::error::ProcessingFailure;
use crate::message::{ProcessingContext, TransportHeaders};

/// The engine a delivery is handed to.
///
/// Implementations may set `SET_ROLLBACK_ONLY` / `SET_REQUEUE_ON_ROLLBACK` on
/// the context before returning. Returning `Err` means the engine itself
/// faulted; the bridge discards the message in that case, whatever signals
/// were set.
#[async_trait]
pub trait MessagePipeline: Send + Sync {
    /// Pipeline name for logging.
    fn name(&self) -> &str;

    /// Process one message.
    async fn handle(
        &self,
        ctx: &mut ProcessingContext,
        headers: &TransportHeaders,
        operation: Option<&str>,
        content_type: &str,
    ) -> Result<(), ProcessingFailure>;
}
