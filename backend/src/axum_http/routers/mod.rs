pub mod billing;
pub mod mobile_billing;
pub mod payment_webhook;
