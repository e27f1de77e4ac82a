use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use crates::{
    domain::{
        repositories::LicensingUnitOfWork, value_objects::license_webhook::WebhookDisposition,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad, repositories::licensing::LicensingPostgres,
    },
    observability::LicenseAlertNotifier,
    payments::stripe_client::StripeClient,
};
use serde::Serialize;
use tracing::warn;

use crate::{
    config::config_model::Stripe,
    usecases::device_license_webhook::{DeviceLicenseWebhookUseCase, PaymentGateway},
};

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Body returned to the payment processor for every delivery it should not retry.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub result: &'static str,
}

impl From<&WebhookDisposition> for WebhookAck {
    fn from(disposition: &WebhookDisposition) -> Self {
        let result = match disposition {
            WebhookDisposition::Processed(_) => "processed",
            WebhookDisposition::Duplicate => "duplicate",
            WebhookDisposition::Ignored { .. } => "ignored",
            WebhookDisposition::Rejected { .. } => "failed",
        };

        Self {
            received: true,
            result,
        }
    }
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    stripe: &Stripe,
    alerts: Arc<LicenseAlertNotifier>,
) -> Router {
    let licensing_repository = LicensingPostgres::new(Arc::clone(&db_pool));
    let stripe_client = StripeClient::new(stripe.webhook_secret.clone(), stripe.tolerance_seconds);
    if !stripe_client.is_configured() {
        warn!("payment_webhook: STRIPE_WEBHOOK_SECRET is not set, deliveries will be refused");
    }
    let webhook_usecase = DeviceLicenseWebhookUseCase::new(
        Arc::new(licensing_repository),
        Arc::new(stripe_client),
        alerts,
    );

    Router::new()
        .route("/webhook", post(webhook::<LicensingPostgres, StripeClient>))
        .with_state(Arc::new(webhook_usecase))
}

pub async fn webhook<U, G>(
    State(webhook_usecase): State<Arc<DeviceLicenseWebhookUseCase<U, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    U: LicensingUnitOfWork + 'static,
    G: PaymentGateway + 'static,
{
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match webhook_usecase.handle_webhook(&body, signature).await {
        Ok(disposition) => (StatusCode::OK, Json(WebhookAck::from(&disposition))).into_response(),
        Err(e) => e.into_response(),
    }
}
