use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    entities::{
        credit_balances::CreditBalanceEntity,
        credit_ledger_entries::{CreditLedgerEntryEntity, InsertCreditLedgerEntryEntity},
        device_licenses::{DeviceLicenseEntity, InsertDeviceLicenseEntity},
        devices::{DeviceCredentialEntity, DeviceEntity},
        promo_codes::PromoCodeEntity,
        promo_redemptions::{InsertPromoRedemptionEntity, PromoRedemptionEntity},
        tenant_entitlements::TenantEntitlementEntity,
        webhook_events::WebhookEventEntity,
    },
    repositories::{
        LicensingStore, LicensingUnitOfWork, credit_balances::CreditBalanceRepository,
        credit_ledger::CreditLedgerRepository, device_licenses::DeviceLicenseRepository,
        devices::DeviceRepository, entitlements::EntitlementRepository,
        promo_codes::PromoCodeRepository, webhook_events::WebhookEventRepository,
    },
    value_objects::enums::{
        credit_types::CreditType,
        device_license_statuses::DeviceLicenseStatus,
        device_statuses::{CredentialStatus, DeviceStatus},
        webhook_event_statuses::WebhookEventStatus,
    },
};

/// Every table the licensing engine writes, held in memory.
#[derive(Debug, Clone, Default)]
pub struct LicensingState {
    pub promo_codes: Vec<PromoCodeEntity>,
    pub promo_redemptions: Vec<PromoRedemptionEntity>,
    pub credit_balances: Vec<CreditBalanceEntity>,
    pub credit_ledger_entries: Vec<CreditLedgerEntryEntity>,
    pub tenant_entitlements: Vec<TenantEntitlementEntity>,
    pub devices: Vec<DeviceEntity>,
    pub device_credentials: Vec<DeviceCredentialEntity>,
    pub device_licenses: Vec<DeviceLicenseEntity>,
    pub webhook_events: Vec<WebhookEventEntity>,
}

/// Serializable in-memory unit of work.
///
/// A transaction works on a copy of the state and swaps it in only when the work succeeds, so a
/// failed transaction leaves nothing behind. Transactions run one at a time.
#[derive(Debug, Default)]
pub struct InMemoryLicensing {
    state: Mutex<LicensingState>,
}

impl InMemoryLicensing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: LicensingState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn snapshot(&self) -> Result<LicensingState> {
        let guard = self
            .state
            .lock()
            .map_err(|_| anyhow!("in-memory licensing state poisoned"))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl LicensingUnitOfWork for InMemoryLicensing {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<anyhow::Error> + Send + 'static,
        F: FnOnce(&mut dyn LicensingStore) -> Result<T, E> + Send + 'static,
    {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| E::from(anyhow!("in-memory licensing state poisoned")))?;

        let mut draft = guard.clone();
        let result = work(&mut draft)?;
        *guard = draft;

        Ok(result)
    }
}

impl PromoCodeRepository for LicensingState {
    fn find_promo_by_code(&mut self, code: &str) -> Result<Option<PromoCodeEntity>> {
        Ok(self
            .promo_codes
            .iter()
            .find(|promo| promo.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    fn increment_redeemed_if_below_cap(&mut self, promo_code_id: Uuid) -> Result<bool> {
        match self
            .promo_codes
            .iter_mut()
            .find(|promo| promo.id == promo_code_id)
        {
            Some(promo) if promo.redeemed_count < promo.max_redemptions => {
                promo.redeemed_count += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn insert_redemption(&mut self, redemption: InsertPromoRedemptionEntity) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.promo_redemptions.push(PromoRedemptionEntity {
            id,
            promo_code_id: redemption.promo_code_id,
            tenant_id: redemption.tenant_id,
            redeemed_at: redemption.redeemed_at,
        });
        Ok(id)
    }
}

impl CreditBalanceRepository for LicensingState {
    fn add_to_bucket(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        expires_at: DateTime<Utc>,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let type_ = credit_type.to_string();
        if let Some(bucket) = self.credit_balances.iter_mut().find(|bucket| {
            bucket.tenant_id == tenant_id
                && bucket.type_ == type_
                && bucket.expires_at == expires_at
        }) {
            bucket.quantity += quantity;
            bucket.updated_at = now;
            return Ok(());
        }

        self.credit_balances.push(CreditBalanceEntity {
            id: Uuid::new_v4(),
            tenant_id,
            type_,
            quantity,
            expires_at,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    fn find_soonest_spendable(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        now: DateTime<Utc>,
        exclude: &[Uuid],
    ) -> Result<Option<CreditBalanceEntity>> {
        let type_ = credit_type.to_string();
        Ok(self
            .credit_balances
            .iter()
            .filter(|bucket| bucket.tenant_id == tenant_id && bucket.type_ == type_)
            .filter(|bucket| bucket.is_spendable(now))
            .filter(|bucket| !exclude.contains(&bucket.id))
            .min_by_key(|bucket| (bucket.expires_at, bucket.created_at))
            .cloned())
    }

    fn has_expired_credits(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let type_ = credit_type.to_string();
        Ok(self.credit_balances.iter().any(|bucket| {
            bucket.tenant_id == tenant_id
                && bucket.type_ == type_
                && bucket.quantity > 0
                && bucket.expires_at < now
        }))
    }

    fn decrement_if_positive(&mut self, balance_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        match self
            .credit_balances
            .iter_mut()
            .find(|bucket| bucket.id == balance_id)
        {
            Some(bucket) if bucket.quantity > 0 => {
                bucket.quantity -= 1;
                bucket.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn list_spendable(
        &mut self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<CreditBalanceEntity>> {
        let mut buckets: Vec<CreditBalanceEntity> = self
            .credit_balances
            .iter()
            .filter(|bucket| bucket.tenant_id == tenant_id && bucket.is_spendable(now))
            .cloned()
            .collect();
        buckets.sort_by(|a, b| (a.expires_at, &a.type_).cmp(&(b.expires_at, &b.type_)));
        Ok(buckets)
    }
}

impl CreditLedgerRepository for LicensingState {
    fn append_ledger_entry(&mut self, entry: InsertCreditLedgerEntryEntity) -> Result<()> {
        self.credit_ledger_entries.push(CreditLedgerEntryEntity {
            id: Uuid::new_v4(),
            tenant_id: entry.tenant_id,
            type_: entry.type_,
            delta: entry.delta,
            reason: entry.reason,
            ref_id: entry.ref_id,
            created_at: entry.created_at,
        });
        Ok(())
    }

    fn list_ledger_entries(&mut self, tenant_id: Uuid) -> Result<Vec<CreditLedgerEntryEntity>> {
        // Insertion order breaks ties between entries written in the same transaction.
        Ok(self
            .credit_ledger_entries
            .iter()
            .rev()
            .filter(|entry| entry.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

impl LicensingState {
    fn entitlement_mut(&mut self, tenant_id: Uuid) -> &mut TenantEntitlementEntity {
        let position = match self
            .tenant_entitlements
            .iter()
            .position(|entitlement| entitlement.tenant_id == tenant_id)
        {
            Some(position) => position,
            None => {
                self.tenant_entitlements
                    .push(TenantEntitlementEntity::with_defaults(tenant_id, Utc::now()));
                self.tenant_entitlements.len() - 1
            }
        };
        &mut self.tenant_entitlements[position]
    }
}

impl EntitlementRepository for LicensingState {
    fn ensure_entitlement(&mut self, tenant_id: Uuid) -> Result<TenantEntitlementEntity> {
        Ok(self.entitlement_mut(tenant_id).clone())
    }

    fn lock_entitlement(&mut self, tenant_id: Uuid) -> Result<TenantEntitlementEntity> {
        self.ensure_entitlement(tenant_id)
    }

    fn set_valid_until(
        &mut self,
        tenant_id: Uuid,
        valid_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let entitlement = self.entitlement_mut(tenant_id);
        entitlement.valid_until = Some(valid_until);
        entitlement.updated_at = now;
        Ok(())
    }

    fn increment_max_devices(&mut self, tenant_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let entitlement = self.entitlement_mut(tenant_id);
        entitlement.max_devices += 1;
        entitlement.updated_at = now;
        Ok(())
    }
}

impl DeviceRepository for LicensingState {
    fn find_device(&mut self, device_id: Uuid) -> Result<Option<DeviceEntity>> {
        Ok(self
            .devices
            .iter()
            .find(|device| device.id == device_id)
            .cloned())
    }

    fn lock_device(&mut self, device_id: Uuid) -> Result<Option<DeviceEntity>> {
        self.find_device(device_id)
    }

    fn mark_device_seen(&mut self, device_id: Uuid, seen_at: DateTime<Utc>) -> Result<()> {
        if let Some(device) = self.devices.iter_mut().find(|device| device.id == device_id) {
            device.last_seen_at = Some(seen_at);
        }
        Ok(())
    }

    fn count_active_devices(&mut self, tenant_id: Uuid) -> Result<i64> {
        let active_status = DeviceStatus::Active.to_string();
        let active_credential = CredentialStatus::Active.to_string();

        let count = self
            .devices
            .iter()
            .filter(|device| device.tenant_id == tenant_id && device.status == active_status)
            .filter(|device| {
                self.device_credentials.iter().any(|credential| {
                    credential.device_id == device.id && credential.status == active_credential
                })
            })
            .count();

        Ok(count as i64)
    }
}

impl DeviceLicenseRepository for LicensingState {
    fn find_latest_running_license(
        &mut self,
        device_id: Uuid,
    ) -> Result<Option<DeviceLicenseEntity>> {
        let active = DeviceLicenseStatus::Active.to_string();
        Ok(self
            .device_licenses
            .iter()
            .filter(|license| license.device_id == device_id && license.status == active)
            .filter(|license| !license.is_pending())
            .max_by_key(|license| license.ends_at)
            .cloned())
    }

    fn list_pending_licenses(&mut self, device_id: Uuid) -> Result<Vec<DeviceLicenseEntity>> {
        let active = DeviceLicenseStatus::Active.to_string();
        let mut pending: Vec<DeviceLicenseEntity> = self
            .device_licenses
            .iter()
            .filter(|license| license.device_id == device_id && license.status == active)
            .filter(|license| license.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|license| license.created_at);
        Ok(pending)
    }

    fn insert_device_license(&mut self, license: InsertDeviceLicenseEntity) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.device_licenses.push(DeviceLicenseEntity {
            id,
            tenant_id: license.tenant_id,
            device_id: license.device_id,
            type_: license.type_,
            status: license.status,
            starts_at: license.starts_at,
            ends_at: license.ends_at,
            source: license.source,
            note: license.note,
            provider_session_ref: license.provider_session_ref,
            provider_payment_id: license.provider_payment_id,
            amount_cents: license.amount_cents,
            currency: license.currency,
            purchased_by: license.purchased_by,
            created_at: license.created_at,
        });
        Ok(id)
    }

    fn start_pending_license(
        &mut self,
        license_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<()> {
        let license = self
            .device_licenses
            .iter_mut()
            .find(|license| license.id == license_id)
            .ok_or_else(|| anyhow!("device license {license_id} not found"))?;

        license.starts_at = starts_at;
        license.ends_at = ends_at;
        license.note = None;
        Ok(())
    }

    fn list_device_licenses(
        &mut self,
        tenant_id: Uuid,
        device_id: Uuid,
    ) -> Result<Vec<DeviceLicenseEntity>> {
        Ok(self
            .device_licenses
            .iter()
            .rev()
            .filter(|license| license.tenant_id == tenant_id && license.device_id == device_id)
            .cloned()
            .collect())
    }
}

impl WebhookEventRepository for LicensingState {
    fn claim_webhook_event(
        &mut self,
        external_event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let failed = WebhookEventStatus::Failed.to_string();

        match self
            .webhook_events
            .iter_mut()
            .find(|event| event.external_event_id == external_event_id)
        {
            Some(event) if event.status == failed && event.retryable => {
                event.status = WebhookEventStatus::Processing.to_string();
                event.type_ = event_type.to_string();
                event.payload = payload.clone();
                event.error_message = None;
                event.retryable = false;
                event.processed_at = None;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                self.webhook_events.push(WebhookEventEntity {
                    id: Uuid::new_v4(),
                    external_event_id: external_event_id.to_string(),
                    type_: event_type.to_string(),
                    status: WebhookEventStatus::Processing.to_string(),
                    payload: payload.clone(),
                    outcome: None,
                    error_message: None,
                    retryable: false,
                    processed_at: None,
                    created_at: now,
                });
                Ok(true)
            }
        }
    }

    fn settle_webhook_event(
        &mut self,
        external_event_id: &str,
        status: WebhookEventStatus,
        outcome: Option<serde_json::Value>,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let event = self
            .webhook_events
            .iter_mut()
            .find(|event| event.external_event_id == external_event_id)
            .ok_or_else(|| anyhow!("webhook event {external_event_id} was never claimed"))?;

        event.status = status.to_string();
        event.outcome = outcome;
        event.error_message = error_message;
        event.retryable = false;
        event.processed_at = Some(now);
        Ok(())
    }

    fn record_webhook_failure(
        &mut self,
        external_event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let failed = WebhookEventStatus::Failed.to_string();

        match self
            .webhook_events
            .iter_mut()
            .find(|event| event.external_event_id == external_event_id)
        {
            Some(event) => {
                if event.status == failed && event.retryable {
                    event.error_message = Some(error_message.to_string());
                    event.processed_at = Some(now);
                }
            }
            None => self.webhook_events.push(WebhookEventEntity {
                id: Uuid::new_v4(),
                external_event_id: external_event_id.to_string(),
                type_: event_type.to_string(),
                status: failed,
                payload: payload.clone(),
                outcome: None,
                error_message: Some(error_message.to_string()),
                retryable: true,
                processed_at: Some(now),
                created_at: now,
            }),
        }
        Ok(())
    }

    fn find_webhook_event(
        &mut self,
        external_event_id: &str,
    ) -> Result<Option<WebhookEventEntity>> {
        Ok(self
            .webhook_events
            .iter()
            .find(|event| event.external_event_id == external_event_id)
            .cloned())
    }
}
