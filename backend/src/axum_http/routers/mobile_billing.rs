use std::sync::Arc;

use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post,
};
use crates::{
    domain::{repositories::LicensingUnitOfWork, value_objects::billing::RedeemPromoRequest},
    infra::db::{
        postgres::postgres_connection::PgPoolSquad, repositories::licensing::LicensingPostgres,
    },
};

use crate::{auth::AuthDevice, usecases::mobile_billing::MobileBillingUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let licensing_repository = LicensingPostgres::new(Arc::clone(&db_pool));
    let mobile_billing_usecase = MobileBillingUseCase::new(Arc::new(licensing_repository));

    Router::new()
        .route(
            "/billing/redeem-activate",
            post(redeem_and_activate::<LicensingPostgres>),
        )
        .route("/devices/heartbeat", post(heartbeat::<LicensingPostgres>))
        .with_state(Arc::new(mobile_billing_usecase))
}

pub async fn redeem_and_activate<U>(
    State(mobile_billing_usecase): State<Arc<MobileBillingUseCase<U>>>,
    auth: AuthDevice,
    Json(request): Json<RedeemPromoRequest>,
) -> impl IntoResponse
where
    U: LicensingUnitOfWork + 'static,
{
    match mobile_billing_usecase
        .redeem_and_activate(auth.tenant_id, auth.device_id, request.code)
        .await
    {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn heartbeat<U>(
    State(mobile_billing_usecase): State<Arc<MobileBillingUseCase<U>>>,
    auth: AuthDevice,
) -> impl IntoResponse
where
    U: LicensingUnitOfWork + 'static,
{
    match mobile_billing_usecase
        .heartbeat(auth.tenant_id, auth.device_id)
        .await
    {
        Ok(heartbeat) => (StatusCode::OK, Json(heartbeat)).into_response(),
        Err(e) => e.into_response(),
    }
}
