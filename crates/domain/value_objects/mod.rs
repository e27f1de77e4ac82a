pub mod billing;
pub mod enums;
pub mod entitlements;
pub mod license_webhook;
pub mod payment_events;
