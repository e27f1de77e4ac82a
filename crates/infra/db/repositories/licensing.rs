use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    Connection, PgConnection, RunQueryDsl, define_sql_function, dsl::exists, insert_into,
    prelude::*, select, sql_types::Text, update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{
            credit_balances, credit_ledger_entries, device_credentials, device_licenses, devices,
            promo_codes, promo_redemptions, tenant_entitlements, webhook_events,
        },
    },
};
use domain::{
    entities::{
        credit_balances::{CreditBalanceEntity, InsertCreditBalanceEntity},
        credit_ledger_entries::{CreditLedgerEntryEntity, InsertCreditLedgerEntryEntity},
        device_licenses::{DeviceLicenseEntity, InsertDeviceLicenseEntity, PENDING_ACTIVATION_NOTE},
        devices::DeviceEntity,
        promo_codes::PromoCodeEntity,
        promo_redemptions::InsertPromoRedemptionEntity,
        tenant_entitlements::{
            DEFAULT_MAX_DEVICES, InsertTenantEntitlementEntity, TenantEntitlementEntity,
        },
        webhook_events::{InsertWebhookEventEntity, WebhookEventEntity},
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

define_sql_function!(fn lower(x: Text) -> Text);

pub struct LicensingPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl LicensingPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// Carries the caller's error through diesel's transaction so it can be told apart from a
/// database failure after the rollback.
enum TransactionError<E> {
    Work(E),
    Database(diesel::result::Error),
}

impl<E> From<diesel::result::Error> for TransactionError<E> {
    fn from(value: diesel::result::Error) -> Self {
        TransactionError::Database(value)
    }
}

#[async_trait]
impl LicensingUnitOfWork for LicensingPostgres {
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<anyhow::Error> + Send + 'static,
        F: FnOnce(&mut dyn LicensingStore) -> Result<T, E> + Send + 'static,
    {
        let db_pool = Arc::clone(&self.db_pool);

        let joined = tokio::task::spawn_blocking(move || -> Result<T, E> {
            let mut pooled = db_pool
                .get()
                .map_err(|err| E::from(anyhow::Error::from(err)))?;
            let conn: &mut PgConnection = &mut pooled;

            conn.transaction::<T, TransactionError<E>, _>(|tx| {
                let mut store = PgLicensingStore { conn: tx };
                work(&mut store).map_err(TransactionError::Work)
            })
            .map_err(|err| match err {
                TransactionError::Work(err) => err,
                TransactionError::Database(err) => E::from(anyhow::Error::from(err)),
            })
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(join_err) => Err(E::from(anyhow::Error::from(join_err))),
        }
    }
}

/// Repository view over one open Postgres transaction.
pub struct PgLicensingStore<'a> {
    conn: &'a mut PgConnection,
}

impl PromoCodeRepository for PgLicensingStore<'_> {
    fn find_promo_by_code(&mut self, code: &str) -> Result<Option<PromoCodeEntity>> {
        let result = promo_codes::table
            .filter(lower(promo_codes::code).eq(code.to_lowercase()))
            .select(PromoCodeEntity::as_select())
            .first::<PromoCodeEntity>(self.conn)
            .optional()?;

        Ok(result)
    }

    fn increment_redeemed_if_below_cap(&mut self, promo_code_id: Uuid) -> Result<bool> {
        let updated = update(promo_codes::table)
            .filter(promo_codes::id.eq(promo_code_id))
            .filter(promo_codes::redeemed_count.lt(promo_codes::max_redemptions))
            .set(promo_codes::redeemed_count.eq(promo_codes::redeemed_count + 1))
            .execute(self.conn)?;

        Ok(updated == 1)
    }

    fn insert_redemption(&mut self, redemption: InsertPromoRedemptionEntity) -> Result<Uuid> {
        let result = insert_into(promo_redemptions::table)
            .values(&redemption)
            .returning(promo_redemptions::id)
            .get_result::<Uuid>(self.conn)?;

        Ok(result)
    }
}

impl CreditBalanceRepository for PgLicensingStore<'_> {
    fn add_to_bucket(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        expires_at: DateTime<Utc>,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let bucket = InsertCreditBalanceEntity {
            tenant_id,
            type_: credit_type.to_string(),
            quantity,
            expires_at,
            created_at: now,
            updated_at: now,
        };

        insert_into(credit_balances::table)
            .values(&bucket)
            .on_conflict((
                credit_balances::tenant_id,
                credit_balances::type_,
                credit_balances::expires_at,
            ))
            .do_update()
            .set((
                credit_balances::quantity.eq(credit_balances::quantity + quantity),
                credit_balances::updated_at.eq(now),
            ))
            .execute(self.conn)?;

        Ok(())
    }

    fn find_soonest_spendable(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        now: DateTime<Utc>,
        exclude: &[Uuid],
    ) -> Result<Option<CreditBalanceEntity>> {
        let mut query = credit_balances::table
            .filter(credit_balances::tenant_id.eq(tenant_id))
            .filter(credit_balances::type_.eq(credit_type.to_string()))
            .filter(credit_balances::quantity.gt(0))
            .filter(credit_balances::expires_at.ge(now))
            .select(CreditBalanceEntity::as_select())
            .into_boxed();

        if !exclude.is_empty() {
            query = query.filter(credit_balances::id.ne_all(exclude.to_vec()));
        }

        let result = query
            .order((
                credit_balances::expires_at.asc(),
                credit_balances::created_at.asc(),
            ))
            .first::<CreditBalanceEntity>(self.conn)
            .optional()?;

        Ok(result)
    }

    fn has_expired_credits(
        &mut self,
        tenant_id: Uuid,
        credit_type: CreditType,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = select(exists(
            credit_balances::table
                .filter(credit_balances::tenant_id.eq(tenant_id))
                .filter(credit_balances::type_.eq(credit_type.to_string()))
                .filter(credit_balances::quantity.gt(0))
                .filter(credit_balances::expires_at.lt(now)),
        ))
        .get_result::<bool>(self.conn)?;

        Ok(result)
    }

    fn decrement_if_positive(&mut self, balance_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let updated = update(credit_balances::table)
            .filter(credit_balances::id.eq(balance_id))
            .filter(credit_balances::quantity.gt(0))
            .set((
                credit_balances::quantity.eq(credit_balances::quantity - 1),
                credit_balances::updated_at.eq(now),
            ))
            .execute(self.conn)?;

        Ok(updated == 1)
    }

    fn list_spendable(
        &mut self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<CreditBalanceEntity>> {
        let results = credit_balances::table
            .filter(credit_balances::tenant_id.eq(tenant_id))
            .filter(credit_balances::quantity.gt(0))
            .filter(credit_balances::expires_at.ge(now))
            .order((credit_balances::expires_at.asc(), credit_balances::type_.asc()))
            .select(CreditBalanceEntity::as_select())
            .load::<CreditBalanceEntity>(self.conn)?;

        Ok(results)
    }
}

impl CreditLedgerRepository for PgLicensingStore<'_> {
    fn append_ledger_entry(&mut self, entry: InsertCreditLedgerEntryEntity) -> Result<()> {
        insert_into(credit_ledger_entries::table)
            .values(&entry)
            .execute(self.conn)?;

        Ok(())
    }

    fn list_ledger_entries(&mut self, tenant_id: Uuid) -> Result<Vec<CreditLedgerEntryEntity>> {
        let results = credit_ledger_entries::table
            .filter(credit_ledger_entries::tenant_id.eq(tenant_id))
            .order(credit_ledger_entries::created_at.desc())
            .select(CreditLedgerEntryEntity::as_select())
            .load::<CreditLedgerEntryEntity>(self.conn)?;

        Ok(results)
    }
}

impl PgLicensingStore<'_> {
    fn insert_default_entitlement(&mut self, tenant_id: Uuid) -> Result<()> {
        insert_into(tenant_entitlements::table)
            .values(&InsertTenantEntitlementEntity {
                tenant_id,
                valid_until: None,
                max_devices: DEFAULT_MAX_DEVICES,
            })
            .on_conflict_do_nothing()
            .execute(self.conn)?;

        Ok(())
    }
}

impl EntitlementRepository for PgLicensingStore<'_> {
    fn ensure_entitlement(&mut self, tenant_id: Uuid) -> Result<TenantEntitlementEntity> {
        self.insert_default_entitlement(tenant_id)?;

        let result = tenant_entitlements::table
            .find(tenant_id)
            .select(TenantEntitlementEntity::as_select())
            .first::<TenantEntitlementEntity>(self.conn)?;

        Ok(result)
    }

    fn lock_entitlement(&mut self, tenant_id: Uuid) -> Result<TenantEntitlementEntity> {
        self.insert_default_entitlement(tenant_id)?;

        let result = tenant_entitlements::table
            .find(tenant_id)
            .select(TenantEntitlementEntity::as_select())
            .for_update()
            .first::<TenantEntitlementEntity>(self.conn)?;

        Ok(result)
    }

    fn set_valid_until(
        &mut self,
        tenant_id: Uuid,
        valid_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        update(tenant_entitlements::table.find(tenant_id))
            .set((
                tenant_entitlements::valid_until.eq(Some(valid_until)),
                tenant_entitlements::updated_at.eq(now),
            ))
            .execute(self.conn)?;

        Ok(())
    }

    fn increment_max_devices(&mut self, tenant_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.insert_default_entitlement(tenant_id)?;

        update(tenant_entitlements::table.find(tenant_id))
            .set((
                tenant_entitlements::max_devices.eq(tenant_entitlements::max_devices + 1),
                tenant_entitlements::updated_at.eq(now),
            ))
            .execute(self.conn)?;

        Ok(())
    }
}

impl DeviceRepository for PgLicensingStore<'_> {
    fn find_device(&mut self, device_id: Uuid) -> Result<Option<DeviceEntity>> {
        let result = devices::table
            .find(device_id)
            .select(DeviceEntity::as_select())
            .first::<DeviceEntity>(self.conn)
            .optional()?;

        Ok(result)
    }

    fn lock_device(&mut self, device_id: Uuid) -> Result<Option<DeviceEntity>> {
        let result = devices::table
            .find(device_id)
            .select(DeviceEntity::as_select())
            .for_update()
            .first::<DeviceEntity>(self.conn)
            .optional()?;

        Ok(result)
    }

    fn mark_device_seen(&mut self, device_id: Uuid, seen_at: DateTime<Utc>) -> Result<()> {
        update(devices::table.find(device_id))
            .set(devices::last_seen_at.eq(Some(seen_at)))
            .execute(self.conn)?;

        Ok(())
    }

    fn count_active_devices(&mut self, tenant_id: Uuid) -> Result<i64> {
        let active_credentials = device_credentials::table
            .filter(device_credentials::status.eq(CredentialStatus::Active.to_string()))
            .select(device_credentials::device_id);

        let result = devices::table
            .filter(devices::tenant_id.eq(tenant_id))
            .filter(devices::status.eq(DeviceStatus::Active.to_string()))
            .filter(devices::id.eq_any(active_credentials))
            .count()
            .get_result::<i64>(self.conn)?;

        Ok(result)
    }
}

impl DeviceLicenseRepository for PgLicensingStore<'_> {
    fn find_latest_running_license(
        &mut self,
        device_id: Uuid,
    ) -> Result<Option<DeviceLicenseEntity>> {
        let result = device_licenses::table
            .filter(device_licenses::device_id.eq(device_id))
            .filter(device_licenses::status.eq(DeviceLicenseStatus::Active.to_string()))
            .filter(
                device_licenses::note
                    .is_null()
                    .or(device_licenses::note.ne(PENDING_ACTIVATION_NOTE)),
            )
            .order(device_licenses::ends_at.desc())
            .select(DeviceLicenseEntity::as_select())
            .first::<DeviceLicenseEntity>(self.conn)
            .optional()?;

        Ok(result)
    }

    fn list_pending_licenses(&mut self, device_id: Uuid) -> Result<Vec<DeviceLicenseEntity>> {
        let results = device_licenses::table
            .filter(device_licenses::device_id.eq(device_id))
            .filter(device_licenses::status.eq(DeviceLicenseStatus::Active.to_string()))
            .filter(device_licenses::note.eq(PENDING_ACTIVATION_NOTE))
            .order(device_licenses::created_at.asc())
            .select(DeviceLicenseEntity::as_select())
            .load::<DeviceLicenseEntity>(self.conn)?;

        Ok(results)
    }

    fn insert_device_license(&mut self, license: InsertDeviceLicenseEntity) -> Result<Uuid> {
        let result = insert_into(device_licenses::table)
            .values(&license)
            .returning(device_licenses::id)
            .get_result::<Uuid>(self.conn)?;

        Ok(result)
    }

    fn start_pending_license(
        &mut self,
        license_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<()> {
        update(device_licenses::table.find(license_id))
            .set((
                device_licenses::starts_at.eq(starts_at),
                device_licenses::ends_at.eq(ends_at),
                device_licenses::note.eq(None::<String>),
            ))
            .execute(self.conn)?;

        Ok(())
    }

    fn list_device_licenses(
        &mut self,
        tenant_id: Uuid,
        device_id: Uuid,
    ) -> Result<Vec<DeviceLicenseEntity>> {
        let results = device_licenses::table
            .filter(device_licenses::tenant_id.eq(tenant_id))
            .filter(device_licenses::device_id.eq(device_id))
            .order(device_licenses::created_at.desc())
            .select(DeviceLicenseEntity::as_select())
            .load::<DeviceLicenseEntity>(self.conn)?;

        Ok(results)
    }
}

impl WebhookEventRepository for PgLicensingStore<'_> {
    fn claim_webhook_event(
        &mut self,
        external_event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let inserted = insert_into(webhook_events::table)
            .values(&InsertWebhookEventEntity {
                external_event_id: external_event_id.to_string(),
                type_: event_type.to_string(),
                status: WebhookEventStatus::Processing.to_string(),
                payload: payload.clone(),
                error_message: None,
                retryable: false,
                processed_at: None,
                created_at: now,
            })
            .on_conflict(webhook_events::external_event_id)
            .do_nothing()
            .execute(self.conn)?;

        if inserted == 1 {
            return Ok(true);
        }

        let reclaimed = update(webhook_events::table)
            .filter(webhook_events::external_event_id.eq(external_event_id))
            .filter(webhook_events::status.eq(WebhookEventStatus::Failed.to_string()))
            .filter(webhook_events::retryable.eq(true))
            .set((
                webhook_events::status.eq(WebhookEventStatus::Processing.to_string()),
                webhook_events::type_.eq(event_type),
                webhook_events::payload.eq(payload.clone()),
                webhook_events::error_message.eq(None::<String>),
                webhook_events::retryable.eq(false),
                webhook_events::processed_at.eq(None::<DateTime<Utc>>),
            ))
            .execute(self.conn)?;

        Ok(reclaimed == 1)
    }

    fn settle_webhook_event(
        &mut self,
        external_event_id: &str,
        status: WebhookEventStatus,
        outcome: Option<serde_json::Value>,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        update(webhook_events::table)
            .filter(webhook_events::external_event_id.eq(external_event_id))
            .set((
                webhook_events::status.eq(status.to_string()),
                webhook_events::outcome.eq(outcome),
                webhook_events::error_message.eq(error_message),
                webhook_events::retryable.eq(false),
                webhook_events::processed_at.eq(Some(now)),
            ))
            .execute(self.conn)?;

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
        let inserted = insert_into(webhook_events::table)
            .values(&InsertWebhookEventEntity {
                external_event_id: external_event_id.to_string(),
                type_: event_type.to_string(),
                status: WebhookEventStatus::Failed.to_string(),
                payload: payload.clone(),
                error_message: Some(error_message.to_string()),
                retryable: true,
                processed_at: Some(now),
                created_at: now,
            })
            .on_conflict(webhook_events::external_event_id)
            .do_nothing()
            .execute(self.conn)?;

        if inserted == 0 {
            update(webhook_events::table)
                .filter(webhook_events::external_event_id.eq(external_event_id))
                .filter(webhook_events::status.eq(WebhookEventStatus::Failed.to_string()))
                .filter(webhook_events::retryable.eq(true))
                .set((
                    webhook_events::error_message.eq(Some(error_message)),
                    webhook_events::processed_at.eq(Some(now)),
                ))
                .execute(self.conn)?;
        }

        Ok(())
    }

    fn find_webhook_event(
        &mut self,
        external_event_id: &str,
    ) -> Result<Option<WebhookEventEntity>> {
        let result = webhook_events::table
            .filter(webhook_events::external_event_id.eq(external_event_id))
            .select(WebhookEventEntity::as_select())
            .first::<WebhookEventEntity>(self.conn)
            .optional()?;

        Ok(result)
    }
}
