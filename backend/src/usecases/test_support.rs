use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use axum::async_trait;
use chrono::{DateTime, Utc};
use crates::{
    domain::{
        entities::{
            credit_balances::CreditBalanceEntity,
            credit_ledger_entries::{CreditLedgerEntryEntity, InsertCreditLedgerEntryEntity},
            device_licenses::{DeviceLicenseEntity, InsertDeviceLicenseEntity},
            devices::DeviceEntity,
            promo_codes::PromoCodeEntity,
            promo_redemptions::InsertPromoRedemptionEntity,
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
            credit_types::CreditType, device_statuses::DeviceStatus,
            webhook_event_statuses::WebhookEventStatus,
        },
    },
    infra::db::memory::licensing::InMemoryLicensing,
};
use uuid::Uuid;

use super::licensing_errors::UseCaseResult;

pub(crate) async fn run<T, F>(store: &InMemoryLicensing, work: F) -> UseCaseResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn LicensingStore) -> UseCaseResult<T> + Send + 'static,
{
    store.transaction(work).await
}

/// Active, open-ended promo granting one short license credit that lasts 30 days.
pub(crate) fn promo_code(code: &str, max_redemptions: i32, now: DateTime<Utc>) -> PromoCodeEntity {
    PromoCodeEntity {
        id: Uuid::new_v4(),
        code: code.to_string(),
        active: true,
        valid_from: None,
        valid_until: None,
        max_redemptions,
        redeemed_count: 0,
        grant_license_short: 1,
        grant_license_long: 0,
        grant_device_slots: 0,
        credit_expires_in_days: Some(30),
        created_at: now,
    }
}

pub(crate) fn credit_bucket(
    tenant_id: Uuid,
    credit_type: CreditType,
    quantity: i32,
    expires_at: DateTime<Utc>,
) -> CreditBalanceEntity {
    CreditBalanceEntity {
        id: Uuid::new_v4(),
        tenant_id,
        type_: credit_type.to_string(),
        quantity,
        expires_at,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub(crate) fn device(tenant_id: Uuid, last_seen_at: Option<DateTime<Utc>>) -> DeviceEntity {
    DeviceEntity {
        id: Uuid::new_v4(),
        tenant_id,
        name: "Booth iPad".to_string(),
        status: DeviceStatus::Active.to_string(),
        last_seen_at,
        created_at: Utc::now(),
    }
}

/// Work another session slips in between our reads and our guarded writes.
///
/// Counters are consumed as they fire and are not rolled back with the transaction, so a
/// failure injected once stays spent across a retry.
#[derive(Debug, Default)]
pub(crate) struct Interference {
    /// Rival redemptions that take a promo slot right before our conditional increment.
    pub(crate) rival_redemptions: usize,
    /// Rival consumers that empty a bucket right before our guarded decrement.
    pub(crate) rival_drains: usize,
    /// Device license inserts that fail as if the connection dropped.
    pub(crate) failing_license_inserts: usize,
}

/// Store that forwards to `inner` and plays out `interference` at the guarded writes.
pub(crate) struct InterferingStore<'a> {
    inner: &'a mut dyn LicensingStore,
    interference: &'a mut Interference,
}

impl<'a> InterferingStore<'a> {
    pub(crate) fn new(
        inner: &'a mut dyn LicensingStore,
        interference: &'a mut Interference,
    ) -> Self {
        Self {
            inner,
            interference,
        }
    }
}

impl PromoCodeRepository for InterferingStore<'_> {
    fn find_promo_by_code(&mut self, code: &str) -> Result<Option<PromoCodeEntity>> {
        self.inner.find_promo_by_code(code)
    }

    fn increment_redeemed_if_below_cap(&mut self, promo_code_id: Uuid) -> Result<bool> {
        if self.interference.rival_redemptions > 0 {
            self.interference.rival_redemptions -= 1;
            self.inner.increment_redeemed_if_below_cap(promo_code_id)?;
        }
        self.inner.increment_redeemed_if_below_cap(promo_code_id)
    }

    fn insert_redemption(&mut self, redemption: InsertPromoRedemptionEntity) -> Result<Uuid> {
        self.inner.insert_redemption(redemption)
    }
}

impl CreditBalanceRepository for InterferingStore<'_> {
    fn add_to_bucket(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        expires_at: DateTime<Utc>,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.inner
            .add_to_bucket(tenant_id, credit_type, expires_at, quantity, now)
    }

    fn find_soonest_spendable(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        now: DateTime<Utc>,
        exclude: &[Uuid],
    ) -> Result<Option<CreditBalanceEntity>> {
        self.inner
            .find_soonest_spendable(tenant_id, credit_type, now, exclude)
    }

    fn has_expired_credits(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.inner.has_expired_credits(tenant_id, credit_type, now)
    }

    fn decrement_if_positive(&mut self, balance_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        if self.interference.rival_drains > 0 {
            self.interference.rival_drains -= 1;
            while self.inner.decrement_if_positive(balance_id, now)? {}
        }
        self.inner.decrement_if_positive(balance_id, now)
    }

    fn list_spendable(
        &mut self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<CreditBalanceEntity>> {
        self.inner.list_spendable(tenant_id, now)
    }
}

impl CreditLedgerRepository for InterferingStore<'_> {
    fn append_ledger_entry(&mut self, entry: InsertCreditLedgerEntryEntity) -> Result<()> {
        self.inner.append_ledger_entry(entry)
    }

    fn list_ledger_entries(&mut self, tenant_id: Uuid) -> Result<Vec<CreditLedgerEntryEntity>> {
        self.inner.list_ledger_entries(tenant_id)
    }
}

impl EntitlementRepository for InterferingStore<'_> {
    fn ensure_entitlement(&mut self, tenant_id: Uuid) -> Result<TenantEntitlementEntity> {
        self.inner.ensure_entitlement(tenant_id)
    }

    fn lock_entitlement(&mut self, tenant_id: Uuid) -> Result<TenantEntitlementEntity> {
        self.inner.lock_entitlement(tenant_id)
    }

    fn set_valid_until(
        &mut self,
        tenant_id: Uuid,
        valid_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.inner.set_valid_until(tenant_id, valid_until, now)
    }

    fn increment_max_devices(&mut self, tenant_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.inner.increment_max_devices(tenant_id, now)
    }
}

impl DeviceRepository for InterferingStore<'_> {
    fn find_device(&mut self, device_id: Uuid) -> Result<Option<DeviceEntity>> {
        self.inner.find_device(device_id)
    }

    fn lock_device(&mut self, device_id: Uuid) -> Result<Option<DeviceEntity>> {
        self.inner.lock_device(device_id)
    }

    fn mark_device_seen(&mut self, device_id: Uuid, seen_at: DateTime<Utc>) -> Result<()> {
        self.inner.mark_device_seen(device_id, seen_at)
    }

    fn count_active_devices(&mut self, tenant_id: Uuid) -> Result<i64> {
        self.inner.count_active_devices(tenant_id)
    }
}

impl DeviceLicenseRepository for InterferingStore<'_> {
    fn find_latest_running_license(
        &mut self,
        device_id: Uuid,
    ) -> Result<Option<DeviceLicenseEntity>> {
        self.inner.find_latest_running_license(device_id)
    }

    fn list_pending_licenses(&mut self, device_id: Uuid) -> Result<Vec<DeviceLicenseEntity>> {
        self.inner.list_pending_licenses(device_id)
    }

    fn insert_device_license(&mut self, license: InsertDeviceLicenseEntity) -> Result<Uuid> {
        if self.interference.failing_license_inserts > 0 {
            self.interference.failing_license_inserts -= 1;
            return Err(anyhow!("connection reset while inserting device license"));
        }
        self.inner.insert_device_license(license)
    }

    fn start_pending_license(
        &mut self,
        license_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<()> {
        self.inner.start_pending_license(license_id, starts_at, ends_at)
    }

    fn list_device_licenses(
        &mut self,
        tenant_id: Uuid,
        device_id: Uuid,
    ) -> Result<Vec<DeviceLicenseEntity>> {
        self.inner.list_device_licenses(tenant_id, device_id)
    }
}

impl WebhookEventRepository for InterferingStore<'_> {
    fn claim_webhook_event(
        &mut self,
        external_event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.inner
            .claim_webhook_event(external_event_id, event_type, payload, now)
    }

    fn settle_webhook_event(
        &mut self,
        external_event_id: &str,
        status: WebhookEventStatus,
        outcome: Option<serde_json::Value>,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.inner
            .settle_webhook_event(external_event_id, status, outcome, error_message, now)
    }

    fn record_webhook_failure(
        &mut self,
        external_event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.inner
            .record_webhook_failure(external_event_id, event_type, payload, error_message, now)
    }

    fn find_webhook_event(
        &mut self,
        external_event_id: &str,
    ) -> Result<Option<WebhookEventEntity>> {
        self.inner.find_webhook_event(external_event_id)
    }
}

/// Unit of work over [`InMemoryLicensing`] whose transactions all see the same interference.
pub(crate) struct InterferingLicensing {
    store: Arc<InMemoryLicensing>,
    interference: Arc<Mutex<Interference>>,
}

impl InterferingLicensing {
    pub(crate) fn new(store: Arc<InMemoryLicensing>, interference: Interference) -> Self {
        Self {
            store,
            interference: Arc::new(Mutex::new(interference)),
        }
    }
}

#[async_trait]
impl LicensingUnitOfWork for InterferingLicensing {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<anyhow::Error> + Send + 'static,
        F: FnOnce(&mut dyn LicensingStore) -> Result<T, E> + Send + 'static,
    {
        let interference = Arc::clone(&self.interference);
        self.store
            .transaction(move |store| {
                let mut interference = interference
                    .lock()
                    .map_err(|_| E::from(anyhow!("interference state poisoned")))?;
                work(&mut InterferingStore::new(store, &mut interference))
            })
            .await
    }
}
