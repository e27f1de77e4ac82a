use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::config::config_model::AuthSecrets;

/// Claims of a tenant administrator token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TenantClaims {
    pub sub: String,
    pub tenant_id: String,
    pub role: String,
    pub exp: usize,
}

/// Claims of a token issued to a paired mobile device.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceClaims {
    pub sub: String,
    pub tenant_id: String,
    pub exp: usize,
}

/// Decoding keys for both token kinds, shared with the extractors as a request extension.
#[derive(Clone)]
pub struct AuthKeys {
    tenant: DecodingKey,
    device: DecodingKey,
}

impl AuthKeys {
    pub fn new(secrets: &AuthSecrets) -> Self {
        Self {
            tenant: DecodingKey::from_secret(secrets.tenant_secret.as_bytes()),
            device: DecodingKey::from_secret(secrets.device_secret.as_bytes()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthTenant {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct AuthDevice {
    pub device_id: Uuid,
    pub tenant_id: Uuid,
}

#[derive(Debug)]
pub struct AuthError(anyhow::Error);

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError(err)
    }
}

impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::UNAUTHORIZED,
            format!("Unauthorized: {}", self.0),
        )
            .into_response()
    }
}

pub fn validate_token<C>(token: &str, key: &DecodingKey) -> Result<C, AuthError>
where
    C: DeserializeOwned,
{
    let validation = Validation::new(jsonwebtoken::Algorithm::HS256);

    let token_data = decode::<C>(token, key, &validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

    Ok(token_data.claims)
}

impl TenantClaims {
    pub fn into_auth(self) -> Result<AuthTenant, AuthError> {
        Ok(AuthTenant {
            user_id: parse_id(&self.sub, "user")?,
            tenant_id: parse_id(&self.tenant_id, "tenant")?,
            role: self.role,
        })
    }
}

impl DeviceClaims {
    pub fn into_auth(self) -> Result<AuthDevice, AuthError> {
        Ok(AuthDevice {
            device_id: parse_id(&self.sub, "device")?,
            tenant_id: parse_id(&self.tenant_id, "tenant")?,
        })
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(raw).map_err(|_| AuthError(anyhow::anyhow!("Invalid {} ID in token", what)))
}

fn unauthorized(message: &str) -> (StatusCode, String) {
    (StatusCode::UNAUTHORIZED, message.to_string())
}

fn bearer_token(parts: &Parts) -> Result<&str, (StatusCode, String)> {
    let auth_header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| unauthorized("Invalid Authorization header"))?;

    auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Invalid Authorization header format"))
}

fn auth_keys(parts: &Parts) -> Result<Arc<AuthKeys>, (StatusCode, String)> {
    parts
        .extensions
        .get::<Arc<AuthKeys>>()
        .cloned()
        .ok_or_else(|| unauthorized("Authentication is not configured"))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthTenant
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let keys = auth_keys(parts)?;
        let token = bearer_token(parts)?;

        validate_token::<TenantClaims>(token, &keys.tenant)
            .and_then(TenantClaims::into_auth)
            .map_err(|e| (StatusCode::UNAUTHORIZED, e.0.to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthDevice
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let keys = auth_keys(parts)?;
        let token = bearer_token(parts)?;

        validate_token::<DeviceClaims>(token, &keys.device)
            .and_then(DeviceClaims::into_auth)
            .map_err(|e| (StatusCode::UNAUTHORIZED, e.0.to_string()))
    }
}
