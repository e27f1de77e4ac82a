use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle of a payment processor event in the idempotency ledger.
///
/// `Processing` only exists inside the transaction that claimed the event; committed rows are
/// always one of the three terminal states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WebhookEventStatus {
    Processing,
    Processed,
    Failed,
    Ignored,
}

impl WebhookEventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEventStatus::Processing => "PROCESSING",
            WebhookEventStatus::Processed => "PROCESSED",
            WebhookEventStatus::Failed => "FAILED",
            WebhookEventStatus::Ignored => "IGNORED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "PROCESSING" => Some(WebhookEventStatus::Processing),
            "PROCESSED" => Some(WebhookEventStatus::Processed),
            "FAILED" => Some(WebhookEventStatus::Failed),
            "IGNORED" => Some(WebhookEventStatus::Ignored),
            _ => None,
        }
    }
}

impl Display for WebhookEventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
