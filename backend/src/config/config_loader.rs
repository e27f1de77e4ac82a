use std::{fmt::Display, str::FromStr};

use anyhow::{Context, Result};
use crates::payments::stripe_client::DEFAULT_WEBHOOK_TOLERANCE_SECONDS;

use super::config_model::{AuthSecrets, BackendServer, Database, DotEnvyConfig, Stripe};

const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    from_lookup(|key| std::env::var(key).ok())
}

/// Builds the config from any key lookup, so parsing can be tested without touching
/// the process env.
pub fn from_lookup<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let value = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    let required = |key: &str| value(key).with_context(|| format!("{key} is not set"));

    let backend_server = BackendServer {
        port: parse(&required("SERVER_PORT_BACKEND")?, "SERVER_PORT_BACKEND")?,
        body_limit: parse(&required("SERVER_BODY_LIMIT")?, "SERVER_BODY_LIMIT")?,
        timeout: parse(&required("SERVER_TIMEOUT")?, "SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: match value("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => parse(&raw, "DATABASE_MAX_CONNECTIONS")?,
            None => DEFAULT_DATABASE_MAX_CONNECTIONS,
        },
    };

    let auth = AuthSecrets {
        tenant_secret: required("JWT_TENANT_SECRET")?,
        device_secret: required("JWT_DEVICE_SECRET")?,
    };

    let stripe = Stripe {
        webhook_secret: value("STRIPE_WEBHOOK_SECRET"),
        tolerance_seconds: match value("STRIPE_WEBHOOK_TOLERANCE_SECONDS") {
            Some(raw) => parse(&raw, "STRIPE_WEBHOOK_TOLERANCE_SECONDS")?,
            None => DEFAULT_WEBHOOK_TOLERANCE_SECONDS,
        },
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        auth,
        stripe,
    })
}

fn parse<T>(raw: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|err| anyhow::anyhow!("{key} is invalid: {err}"))
}
