//! Delivery outcome bridge.
//!
//! Every delivery flows through:
//! 1. `MessageContextBuilder::build()` — normalize metadata + payload
//! 2. `MessagePipeline::handle()` — the downstream engine
//! 3. `classify()` — failure / rollback / requeue signals → `AckDirective`
//!
//! The broker consumer only ever sees the directive.

pub mod delivery;
pub mod directive;

pub use delivery::{DeliveryBridge, classify};
pub use directive::{AckDirective, DeliveryStage};
