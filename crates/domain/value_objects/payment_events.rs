use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use super::enums::license_types::LicenseType;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Payment processor events this service understands, decoded from the event's `data.object`.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    CheckoutCompleted(CheckoutCompleted),
    /// A known event type whose object could not be decoded.
    Unparsed { event_type: String, reason: String },
    Unrecognized { event_type: String },
}

impl PaymentEvent {
    pub fn from_parts(event_type: &str, object: serde_json::Value) -> Self {
        match event_type {
            CHECKOUT_SESSION_COMPLETED => match serde_json::from_value(object) {
                Ok(session) => PaymentEvent::CheckoutCompleted(session),
                Err(err) => PaymentEvent::Unparsed {
                    event_type: event_type.to_string(),
                    reason: err.to_string(),
                },
            },
            other => PaymentEvent::Unrecognized {
                event_type: other.to_string(),
            },
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            PaymentEvent::CheckoutCompleted(_) => CHECKOUT_SESSION_COMPLETED,
            PaymentEvent::Unparsed { event_type, .. }
            | PaymentEvent::Unrecognized { event_type } => event_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutCompleted {
    pub id: Option<String>,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Device license purchase described by checkout session metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LicensePurchase {
    pub tenant_id: Uuid,
    pub device_id: Uuid,
    pub license_type: LicenseType,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Error, PartialEq)]
pub enum PurchaseMetadataError {
    #[error("missing metadata field: {0}")]
    Missing(&'static str),
    #[error("invalid metadata field {field}: {value}")]
    Invalid { field: &'static str, value: String },
}

impl CheckoutCompleted {
    pub fn license_purchase(&self) -> Result<LicensePurchase, PurchaseMetadataError> {
        let tenant_id = self.required_uuid("tenant_id")?;
        let device_id = self.required_uuid("device_id")?;

        let raw_license_type = self
            .non_empty("license_type")
            .ok_or(PurchaseMetadataError::Missing("license_type"))?;
        let license_type = LicenseType::from_str(raw_license_type).ok_or_else(|| {
            PurchaseMetadataError::Invalid {
                field: "license_type",
                value: raw_license_type.to_string(),
            }
        })?;

        let user_id = match self.non_empty("user_id") {
            Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
                PurchaseMetadataError::Invalid {
                    field: "user_id",
                    value: raw.to_string(),
                }
            })?),
            None => None,
        };

        Ok(LicensePurchase {
            tenant_id,
            device_id,
            license_type,
            user_id,
        })
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn required_uuid(&self, field: &'static str) -> Result<Uuid, PurchaseMetadataError> {
        let raw = self
            .non_empty(field)
            .ok_or(PurchaseMetadataError::Missing(field))?;
        Uuid::parse_str(raw).map_err(|_| PurchaseMetadataError::Invalid {
            field,
            value: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_checkout_completed_with_license_metadata() {
        let tenant_id = Uuid::new_v4();
        let device_id = Uuid::new_v4();
        let event = PaymentEvent::from_parts(
            CHECKOUT_SESSION_COMPLETED,
            json!({
                "id": "cs_test_1",
                "payment_intent": "pi_1",
                "amount_total": 4900,
                "currency": "eur",
                "metadata": {
                    "tenant_id": tenant_id.to_string(),
                    "device_id": device_id.to_string(),
                    "license_type": "LICENSE_LONG"
                }
            }),
        );

        let PaymentEvent::CheckoutCompleted(session) = event else {
            panic!("expected checkout completed, got {event:?}");
        };
        let purchase = session.license_purchase().unwrap();
        assert_eq!(purchase.tenant_id, tenant_id);
        assert_eq!(purchase.device_id, device_id);
        assert_eq!(purchase.license_type, LicenseType::Long);
        assert_eq!(purchase.user_id, None);
        assert_eq!(session.amount_total, Some(4900));
    }

    #[test]
    fn other_event_types_fall_back_to_unrecognized() {
        let event = PaymentEvent::from_parts("invoice.paid", json!({ "id": "in_1" }));

        assert_eq!(
            event,
            PaymentEvent::Unrecognized {
                event_type: "invoice.paid".to_string()
            }
        );
    }

    #[test]
    fn undecodable_checkout_object_is_unparsed() {
        let event = PaymentEvent::from_parts(CHECKOUT_SESSION_COMPLETED, json!({ "metadata": 42 }));

        assert!(matches!(event, PaymentEvent::Unparsed { .. }));
        assert_eq!(event.event_type(), CHECKOUT_SESSION_COMPLETED);
    }

    #[test]
    fn missing_and_invalid_metadata_are_reported_by_field() {
        let mut session = CheckoutCompleted {
            id: None,
            payment_intent: None,
            amount_total: None,
            currency: None,
            metadata: HashMap::from([("tenant_id".to_string(), Uuid::new_v4().to_string())]),
        };
        assert_eq!(
            session.license_purchase(),
            Err(PurchaseMetadataError::Missing("device_id"))
        );

        session
            .metadata
            .insert("device_id".to_string(), "not-a-uuid".to_string());
        assert_eq!(
            session.license_purchase(),
            Err(PurchaseMetadataError::Invalid {
                field: "device_id",
                value: "not-a-uuid".to_string()
            })
        );

        session
            .metadata
            .insert("device_id".to_string(), Uuid::new_v4().to_string());
        session
            .metadata
            .insert("license_type".to_string(), "LIFETIME".to_string());
        assert!(matches!(
            session.license_purchase(),
            Err(PurchaseMetadataError::Invalid { field: "license_type", .. })
        ));
    }
}
