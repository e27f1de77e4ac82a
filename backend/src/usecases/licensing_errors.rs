use axum::http::StatusCode;
use crates::domain::entities::promo_codes::PromoRejection;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LicensingError {
    #[error("promo code is invalid")]
    InvalidCode,
    #[error("promo code is not valid at this time")]
    CodeExpired,
    #[error("promo code has no redemptions left")]
    CodeLimitReached,
    #[error("no credits available")]
    NoCredits,
    #[error("all matching credits have expired")]
    CreditsExpired,
    #[error("device not found")]
    DeviceNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LicensingError {
    pub fn code(&self) -> &'static str {
        match self {
            LicensingError::InvalidCode => "INVALID_CODE",
            LicensingError::CodeExpired => "CODE_EXPIRED",
            LicensingError::CodeLimitReached => "CODE_LIMIT_REACHED",
            LicensingError::NoCredits => "NO_CREDITS",
            LicensingError::CreditsExpired => "CREDITS_EXPIRED",
            LicensingError::DeviceNotFound => "DEVICE_NOT_FOUND",
            LicensingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            LicensingError::InvalidCode | LicensingError::CodeExpired => StatusCode::BAD_REQUEST,
            LicensingError::CodeLimitReached => StatusCode::CONFLICT,
            LicensingError::NoCredits | LicensingError::CreditsExpired => {
                StatusCode::PAYMENT_REQUIRED
            }
            LicensingError::DeviceNotFound => StatusCode::NOT_FOUND,
            LicensingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn log(&self, tenant_id: Uuid, operation: &'static str) {
        match self {
            LicensingError::Internal(err) => error!(
                %tenant_id,
                operation,
                db_error = ?err,
                "licensing: operation failed"
            ),
            _ => warn!(
                %tenant_id,
                operation,
                code = self.code(),
                status = self.status_code().as_u16(),
                "licensing: request rejected"
            ),
        }
    }
}

impl From<PromoRejection> for LicensingError {
    fn from(value: PromoRejection) -> Self {
        match value {
            PromoRejection::Inactive => LicensingError::InvalidCode,
            PromoRejection::OutsideValidityWindow => LicensingError::CodeExpired,
            PromoRejection::LimitReached => LicensingError::CodeLimitReached,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, LicensingError>;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook verification is not configured: {0}")]
    Configuration(String),
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::Configuration(_) => "WEBHOOK_NOT_CONFIGURED",
            WebhookError::InvalidSignature(_) => "INVALID_SIGNATURE",
            WebhookError::InvalidPayload(_) => "INVALID_PAYLOAD",
            WebhookError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature(_) | WebhookError::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Configuration(_) | WebhookError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn licensing_errors_map_to_stable_codes_and_statuses() {
        let cases = [
            (LicensingError::InvalidCode, "INVALID_CODE", 400),
            (LicensingError::CodeExpired, "CODE_EXPIRED", 400),
            (LicensingError::CodeLimitReached, "CODE_LIMIT_REACHED", 409),
            (LicensingError::NoCredits, "NO_CREDITS", 402),
            (LicensingError::CreditsExpired, "CREDITS_EXPIRED", 402),
            (LicensingError::DeviceNotFound, "DEVICE_NOT_FOUND", 404),
        ];

        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status_code().as_u16(), status);
        }
    }

    #[test]
    fn promo_rejections_become_validation_errors() {
        assert!(matches!(
            LicensingError::from(PromoRejection::Inactive),
            LicensingError::InvalidCode
        ));
        assert!(matches!(
            LicensingError::from(PromoRejection::OutsideValidityWindow),
            LicensingError::CodeExpired
        ));
        assert!(matches!(
            LicensingError::from(PromoRejection::LimitReached),
            LicensingError::CodeLimitReached
        ));
    }

    #[test]
    fn only_signature_and_payload_errors_are_client_errors() {
        assert_eq!(
            WebhookError::InvalidSignature("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::Configuration("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
