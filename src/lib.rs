//! Delivery bridge — turns broker deliveries into acknowledgement directives.

pub mod bridge;
pub mod config;
pub mod consumer;
pub mod error;
pub mod logging;
pub mod message;
pub mod pipeline;
pub mod signal;

pub use bridge::{AckDirective, DeliveryBridge};
pub use message::{ProcessingContext, TransportMetadata};
pub use pipeline::MessagePipeline;
