use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    repositories::LicensingUnitOfWork,
    value_objects::{
        billing::{BillingOverviewDto, DeviceLicenseDto, LedgerEntryDto},
        enums::credit_actions::CreditAction,
    },
};
use tracing::info;
use uuid::Uuid;

use super::{
    billing_overview::assemble_overview,
    credit_consumption::consume_credit,
    licensing_errors::{LicensingError, UseCaseResult},
    promo_redemption::redeem_promo,
};

/// Tenant-facing credit and entitlement operations. Every call is one transaction.
pub struct BillingUseCase<U>
where
    U: LicensingUnitOfWork + 'static,
{
    unit_of_work: Arc<U>,
}

impl<U> BillingUseCase<U>
where
    U: LicensingUnitOfWork + 'static,
{
    pub fn new(unit_of_work: Arc<U>) -> Self {
        Self { unit_of_work }
    }

    pub async fn redeem_promo(
        &self,
        tenant_id: Uuid,
        code: String,
    ) -> UseCaseResult<BillingOverviewDto> {
        info!(%tenant_id, "billing: redeeming promo code");
        let now = Utc::now();

        let result: UseCaseResult<BillingOverviewDto> = self
            .unit_of_work
            .transaction(move |store| {
                redeem_promo(store, tenant_id, &code, now)?;
                Ok(assemble_overview(store, tenant_id, now)?)
            })
            .await;

        result.inspect_err(|err| err.log(tenant_id, "redeem_promo"))
    }

    pub async fn consume_credit(
        &self,
        tenant_id: Uuid,
        action: CreditAction,
    ) -> UseCaseResult<BillingOverviewDto> {
        info!(%tenant_id, %action, "billing: consuming credit");
        let now = Utc::now();

        let result: UseCaseResult<BillingOverviewDto> = self
            .unit_of_work
            .transaction(move |store| {
                consume_credit(store, tenant_id, action, now)?;
                Ok(assemble_overview(store, tenant_id, now)?)
            })
            .await;

        result.inspect_err(|err| err.log(tenant_id, "consume_credit"))
    }

    pub async fn overview(&self, tenant_id: Uuid) -> UseCaseResult<BillingOverviewDto> {
        let now = Utc::now();

        self.unit_of_work
            .transaction(move |store| Ok(assemble_overview(store, tenant_id, now)?))
            .await
            .inspect_err(|err: &LicensingError| err.log(tenant_id, "overview"))
    }

    pub async fn ledger(&self, tenant_id: Uuid) -> UseCaseResult<Vec<LedgerEntryDto>> {
        self.unit_of_work
            .transaction(move |store| {
                let entries = store.list_ledger_entries(tenant_id)?;
                Ok(entries.into_iter().map(LedgerEntryDto::from).collect())
            })
            .await
            .inspect_err(|err: &LicensingError| err.log(tenant_id, "ledger"))
    }

    pub async fn device_licenses(
        &self,
        tenant_id: Uuid,
        device_id: Uuid,
    ) -> UseCaseResult<Vec<DeviceLicenseDto>> {
        self.unit_of_work
            .transaction(move |store| {
                store
                    .find_device(device_id)?
                    .filter(|device| device.tenant_id == tenant_id)
                    .ok_or(LicensingError::DeviceNotFound)?;

                let licenses = store.list_device_licenses(tenant_id, device_id)?;
                Ok(licenses.into_iter().map(DeviceLicenseDto::from).collect())
            })
            .await
            .inspect_err(|err: &LicensingError| err.log(tenant_id, "device_licenses"))
    }
}
