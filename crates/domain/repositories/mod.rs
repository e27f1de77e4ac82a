//! Storage contracts for the licensing engine.
//!
//! Each entity gets its own statically-typed repository. All of them are implemented by a single
//! transaction-scoped store, so a use case composes them through [`LicensingStore`] inside one
//! [`LicensingUnitOfWork::transaction`] call and either every write commits or none does.

pub mod credit_balances;
pub mod credit_ledger;
pub mod device_licenses;
pub mod devices;
pub mod entitlements;
pub mod licensing_unit_of_work;
pub mod promo_codes;
pub mod webhook_events;

pub use licensing_unit_of_work::{LicensingStore, LicensingUnitOfWork};
