use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::domain::value_objects::payment_events::PaymentEvent;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_WEBHOOK_TOLERANCE_SECONDS: i64 = 300;

/// Verifies Stripe webhook deliveries. Outbound API calls are not needed by this service.
pub struct StripeClient {
    webhook_secret: Option<String>,
    tolerance_seconds: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum WebhookVerificationError {
    #[error("stripe webhook secret is not configured")]
    MissingSecret,
    #[error("missing timestamp in stripe-signature")]
    MissingTimestamp,
    #[error("missing v1 in stripe-signature")]
    MissingSignature,
    #[error("invalid timestamp in stripe-signature: {0}")]
    InvalidTimestamp(String),
    #[error("invalid webhook signature")]
    Mismatch,
    #[error("webhook timestamp outside tolerance ({age_seconds}s)")]
    StaleTimestamp { age_seconds: i64 },
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// A delivery whose signature checked out.
#[derive(Debug, Clone)]
pub struct VerifiedWebhook {
    pub event: StripeEvent,
    pub payload: serde_json::Value,
}

impl StripeEvent {
    pub fn payment_event(&self) -> PaymentEvent {
        PaymentEvent::from_parts(&self.type_, self.data.object.clone())
    }
}

impl StripeClient {
    pub fn new(webhook_secret: Option<String>, tolerance_seconds: i64) -> Self {
        Self {
            webhook_secret: webhook_secret.filter(|secret| !secret.trim().is_empty()),
            tolerance_seconds,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_secret.is_some()
    }

    /// Verifies the webhook signature. https://stripe.com/docs/webhooks/signatures
    ///
    /// Every `v1` entry in the header is tried, which keeps deliveries valid while the
    /// endpoint secret is being rolled.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedWebhook, WebhookVerificationError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or(WebhookVerificationError::MissingSecret)?;

        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest);
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signatures.push(rest);
            }
        }

        let timestamp = timestamp.ok_or(WebhookVerificationError::MissingTimestamp)?;
        if signatures.is_empty() {
            return Err(WebhookVerificationError::MissingSignature);
        }
        let signed_at: i64 = timestamp
            .parse()
            .map_err(|_| WebhookVerificationError::InvalidTimestamp(timestamp.to_string()))?;

        let matched = signatures.iter().any(|signature| {
            let Ok(provided) = hex::decode(signature) else {
                return false;
            };
            let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
                return false;
            };
            mac.update(timestamp.as_bytes());
            mac.update(b".");
            mac.update(payload);
            mac.verify_slice(&provided).is_ok()
        });
        if !matched {
            return Err(WebhookVerificationError::Mismatch);
        }

        let age_seconds = now.timestamp() - signed_at;
        if age_seconds.abs() > self.tolerance_seconds {
            return Err(WebhookVerificationError::StaleTimestamp { age_seconds });
        }

        let payload: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|err| WebhookVerificationError::MalformedPayload(err.to_string()))?;
        let event: StripeEvent = serde_json::from_value(payload.clone())
            .map_err(|err| WebhookVerificationError::MalformedPayload(err.to_string()))?;

        Ok(VerifiedWebhook { event, payload })
    }
}
