//! Acknowledgement directives and per-delivery stages.

use serde::{Deserialize, Serialize};

/// What the broker consumer must do with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckDirective {
    /// Processing succeeded; remove the message.
    Acknowledge,
    /// Processing failed but may succeed later; redeliver.
    RejectRequeue,
    /// Processing failed for good; remove without redelivery.
    RejectDiscard,
}

impl AckDirective {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Acknowledge => "acknowledge",
            Self::RejectRequeue => "reject_requeue",
            Self::RejectDiscard => "reject_discard",
        }
    }

    /// The `requeue` argument of a broker reject/nack, or `None` for an ack.
    pub fn requeue(&self) -> Option<bool> {
        match self {
            Self::Acknowledge => None,
            Self::RejectRequeue => Some(true),
            Self::RejectDiscard => Some(false),
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Acknowledge)
    }
}

impl std::fmt::Display for AckDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a delivery is in its single pass through the bridge.
///
/// `Received → ContextBuilt → Processed | Failed`, or `Received → Rejected`
/// when the context cannot be built. Every path ends in a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStage {
    Received,
    ContextBuilt,
    Processed,
    Failed,
    Rejected,
}

impl DeliveryStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::ContextBuilt => "context_built",
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_labels() {
        assert_eq!(AckDirective::Acknowledge.label(), "acknowledge");
        assert_eq!(AckDirective::RejectRequeue.label(), "reject_requeue");
        assert_eq!(AckDirective::RejectDiscard.label(), "reject_discard");
        assert_eq!(AckDirective::RejectRequeue.to_string(), "reject_requeue");
    }

    #[test]
    fn directive_requeue_flag() {
        assert_eq!(AckDirective::Acknowledge.requeue(), None);
        assert_eq!(AckDirective::RejectRequeue.requeue(), Some(true));
        assert_eq!(AckDirective::RejectDiscard.requeue(), Some(false));
        assert!(AckDirective::Acknowledge.is_ack());
        assert!(!AckDirective::RejectDiscard.is_ack());
    }

    #[test]
    fn directive_serialization() {
        let json = serde_json::to_value(AckDirective::RejectRequeue).unwrap();
        assert_eq!(json, "reject_requeue");
        let back: AckDirective = serde_json::from_str("\"reject_discard\"").unwrap();
        assert_eq!(back, AckDirective::RejectDiscard);
    }
}
