pub mod billing;
pub mod billing_overview;
pub mod credit_consumption;
pub mod device_activation;
pub mod device_license_webhook;
pub mod licensing_errors;
pub mod mobile_billing;
pub mod promo_redemption;

#[cfg(test)]
pub(crate) mod test_support;
