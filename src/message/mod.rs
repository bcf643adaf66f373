//! Inbound delivery normalization.
//!
//! - `types` — raw transport metadata and the immutable `InboundMessage`
//! - `context` — the per-message `ProcessingContext` signal bag
//! - `builder` — `MessageContextBuilder`, metadata + payload → context

pub mod builder;
pub mod context;
pub mod types;

pub use builder::MessageContextBuilder;
pub use context::{ProcessingContext, SET_REQUEUE_ON_ROLLBACK, SET_ROLLBACK_ONLY};
pub use types::{InboundMessage, TransportHeaders, TransportMetadata};
