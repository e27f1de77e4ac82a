pub mod credit_actions;
pub mod credit_types;
pub mod device_license_statuses;
pub mod device_statuses;
pub mod ledger_reasons;
pub mod license_types;
pub mod webhook_event_statuses;
