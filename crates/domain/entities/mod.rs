pub mod credit_balances;
pub mod credit_ledger_entries;
pub mod device_licenses;
pub mod devices;
pub mod promo_codes;
pub mod promo_redemptions;
pub mod tenant_entitlements;
pub mod webhook_events;
