use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::usecases::licensing_errors::{LicensingError, WebhookError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    fn render(status: StatusCode, error: &str, message: String) -> Response {
        let body = Json(ErrorResponse {
            code: status.as_u16(),
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl IntoResponse for LicensingError {
    fn into_response(self) -> Response {
        let message = match &self {
            // Don't leak internal error detail to client
            LicensingError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        ErrorResponse::render(self.status_code(), self.code(), message)
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let message = match &self {
            WebhookError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        ErrorResponse::render(self.status_code(), self.code(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn domain_error_carries_machine_code() {
        let response = LicensingError::CodeLimitReached.into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["code"], 409);
        assert_eq!(body["error"], "CODE_LIMIT_REACHED");
    }

    #[tokio::test]
    async fn internal_detail_is_hidden() {
        let response =
            LicensingError::Internal(anyhow::anyhow!("relation \"credit_balances\" does not exist"))
                .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn webhook_signature_error_is_bad_request() {
        let response = WebhookError::InvalidSignature("no matching v1 signature".to_string())
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "INVALID_SIGNATURE");
    }
}
