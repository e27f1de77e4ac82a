use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::{
        credit_balances::CreditBalanceEntity, credit_ledger_entries::CreditLedgerEntryEntity,
        device_licenses::DeviceLicenseEntity,
    },
    value_objects::enums::{credit_actions::CreditAction, credit_types::CreditType},
};

/// Credits expiring within this many days are counted as "expiring soon".
pub const EXPIRING_SOON_DAYS: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct RedeemPromoRequest {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumeCreditRequest {
    pub action: CreditAction,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillingOverviewDto {
    pub entitlement: EntitlementSnapshotDto,
    pub credits: Vec<CreditBalanceDto>,
    pub expiring_soon: ExpiringSoonDto,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementSnapshotDto {
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub max_devices: i32,
    pub active_devices: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreditBalanceDto {
    #[serde(rename = "type")]
    pub credit_type: String,
    pub quantity: i32,
    pub expires_at: DateTime<Utc>,
}

impl From<CreditBalanceEntity> for CreditBalanceDto {
    fn from(value: CreditBalanceEntity) -> Self {
        Self {
            credit_type: value.type_,
            quantity: value.quantity,
            expires_at: value.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpiringSoonDto {
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivationStatusDto {
    pub is_active: bool,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryDto {
    #[serde(rename = "type")]
    pub credit_type: String,
    pub delta: i32,
    pub reason: String,
    pub ref_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<CreditLedgerEntryEntity> for LedgerEntryDto {
    fn from(value: CreditLedgerEntryEntity) -> Self {
        Self {
            credit_type: value.type_,
            delta: value.delta,
            reason: value.reason,
            ref_id: value.ref_id,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLicenseDto {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub license_type: String,
    pub status: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub pending: bool,
    pub source: String,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
}

impl From<DeviceLicenseEntity> for DeviceLicenseDto {
    fn from(value: DeviceLicenseEntity) -> Self {
        let pending = value.is_pending();
        Self {
            id: value.id,
            license_type: value.type_,
            status: value.status,
            starts_at: value.starts_at,
            ends_at: value.ends_at,
            pending,
            source: value.source,
            amount_cents: value.amount_cents,
            currency: value.currency,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHeartbeatDto {
    pub device_id: Uuid,
    pub licensed_until: Option<DateTime<Utc>>,
    pub started_pending: usize,
}

/// Credit types that unlock a license term, longest first.
pub const LICENSE_CREDIT_PREFERENCE: [CreditType; 2] =
    [CreditType::LicenseLong, CreditType::LicenseShort];
