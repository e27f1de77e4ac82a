use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    repositories::LicensingUnitOfWork,
    value_objects::{
        billing::{ActivationStatusDto, DeviceHeartbeatDto, LICENSE_CREDIT_PREFERENCE},
        entitlements::is_active,
        enums::credit_actions::CreditAction,
    },
};
use tracing::info;
use uuid::Uuid;

use super::{
    credit_consumption::consume_credit,
    device_activation::record_heartbeat,
    licensing_errors::{LicensingError, UseCaseResult},
    promo_redemption::redeem_promo,
};

/// Operations a signed-in device performs for its tenant.
pub struct MobileBillingUseCase<U>
where
    U: LicensingUnitOfWork + 'static,
{
    unit_of_work: Arc<U>,
}

impl<U> MobileBillingUseCase<U>
where
    U: LicensingUnitOfWork + 'static,
{
    pub fn new(unit_of_work: Arc<U>) -> Self {
        Self { unit_of_work }
    }

    /// Redeems the code and immediately spends one of the license credits it granted,
    /// preferring the longer license. Nothing is kept if that spend fails.
    pub async fn redeem_and_activate(
        &self,
        tenant_id: Uuid,
        device_id: Uuid,
        code: String,
    ) -> UseCaseResult<ActivationStatusDto> {
        info!(%tenant_id, %device_id, "mobile_billing: redeem and activate");
        let now = Utc::now();

        let result: UseCaseResult<ActivationStatusDto> = self
            .unit_of_work
            .transaction(move |store| {
                let redeemed = redeem_promo(store, tenant_id, &code, now)?;
                let granted = redeemed.promo.grants();

                let license_type = LICENSE_CREDIT_PREFERENCE
                    .iter()
                    .find(|preferred| {
                        granted
                            .iter()
                            .any(|(credit_type, _)| credit_type == *preferred)
                    })
                    .and_then(|credit_type| credit_type.license_type())
                    .ok_or(LicensingError::NoCredits)?;

                consume_credit(store, tenant_id, CreditAction::for_license(license_type), now)?;

                let entitlement = store.ensure_entitlement(tenant_id)?;
                Ok(ActivationStatusDto {
                    is_active: is_active(entitlement.valid_until, now),
                    valid_until: entitlement.valid_until,
                })
            })
            .await;

        result.inspect_err(|err| err.log(tenant_id, "redeem_and_activate"))
    }

    pub async fn heartbeat(
        &self,
        tenant_id: Uuid,
        device_id: Uuid,
    ) -> UseCaseResult<DeviceHeartbeatDto> {
        let now = Utc::now();

        let result: UseCaseResult<DeviceHeartbeatDto> = self
            .unit_of_work
            .transaction(move |store| record_heartbeat(store, tenant_id, device_id, now))
            .await;

        result.inspect_err(|err| err.log(tenant_id, "heartbeat"))
    }
}
