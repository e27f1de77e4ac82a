use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::LicensingUnitOfWork,
        value_objects::billing::{ConsumeCreditRequest, RedeemPromoRequest},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad, repositories::licensing::LicensingPostgres,
    },
};
use uuid::Uuid;

use crate::{auth::AuthTenant, usecases::billing::BillingUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let licensing_repository = LicensingPostgres::new(Arc::clone(&db_pool));
    let billing_usecase = BillingUseCase::new(Arc::new(licensing_repository));

    Router::new()
        .route("/redeem", post(redeem::<LicensingPostgres>))
        .route("/consume", post(consume::<LicensingPostgres>))
        .route("/overview", get(overview::<LicensingPostgres>))
        .route("/ledger", get(ledger::<LicensingPostgres>))
        .route(
            "/devices/:device_id/licenses",
            get(device_licenses::<LicensingPostgres>),
        )
        .with_state(Arc::new(billing_usecase))
}

pub async fn redeem<U>(
    State(billing_usecase): State<Arc<BillingUseCase<U>>>,
    auth: AuthTenant,
    Json(request): Json<RedeemPromoRequest>,
) -> impl IntoResponse
where
    U: LicensingUnitOfWork + 'static,
{
    match billing_usecase
        .redeem_promo(auth.tenant_id, request.code)
        .await
    {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn consume<U>(
    State(billing_usecase): State<Arc<BillingUseCase<U>>>,
    auth: AuthTenant,
    Json(request): Json<ConsumeCreditRequest>,
) -> impl IntoResponse
where
    U: LicensingUnitOfWork + 'static,
{
    match billing_usecase
        .consume_credit(auth.tenant_id, request.action)
        .await
    {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn overview<U>(
    State(billing_usecase): State<Arc<BillingUseCase<U>>>,
    auth: AuthTenant,
) -> impl IntoResponse
where
    U: LicensingUnitOfWork + 'static,
{
    match billing_usecase.overview(auth.tenant_id).await {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn ledger<U>(
    State(billing_usecase): State<Arc<BillingUseCase<U>>>,
    auth: AuthTenant,
) -> impl IntoResponse
where
    U: LicensingUnitOfWork + 'static,
{
    match billing_usecase.ledger(auth.tenant_id).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn device_licenses<U>(
    State(billing_usecase): State<Arc<BillingUseCase<U>>>,
    auth: AuthTenant,
    Path(device_id): Path<Uuid>,
) -> impl IntoResponse
where
    U: LicensingUnitOfWork + 'static,
{
    match billing_usecase
        .device_licenses(auth.tenant_id, device_id)
        .await
    {
        Ok(licenses) => (StatusCode::OK, Json(licenses)).into_response(),
        Err(e) => e.into_response(),
    }
}
