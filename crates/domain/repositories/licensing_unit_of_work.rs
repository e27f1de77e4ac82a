use async_trait::async_trait;

use super::{
    credit_balances::CreditBalanceRepository, credit_ledger::CreditLedgerRepository,
    device_licenses::DeviceLicenseRepository, devices::DeviceRepository,
    entitlements::EntitlementRepository, promo_codes::PromoCodeRepository,
    webhook_events::WebhookEventRepository,
};

/// Every repository the licensing engine touches, bound to one open transaction.
pub trait LicensingStore:
    PromoCodeRepository
    + CreditBalanceRepository
    + CreditLedgerRepository
    + EntitlementRepository
    + DeviceRepository
    + DeviceLicenseRepository
    + WebhookEventRepository
{
}

impl<T> LicensingStore for T where
    T: PromoCodeRepository
        + CreditBalanceRepository
        + CreditLedgerRepository
        + EntitlementRepository
        + DeviceRepository
        + DeviceLicenseRepository
        + WebhookEventRepository
{
}

#[async_trait]
pub trait LicensingUnitOfWork: Send + Sync {
    /// Runs `work` inside a single transaction. It commits when `work` returns `Ok` and rolls
    /// back every write when it returns `Err`.
    async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<anyhow::Error> + Send + 'static,
        F: FnOnce(&mut dyn LicensingStore) -> Result<T, E> + Send + 'static;
}
