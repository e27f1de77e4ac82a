#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub auth: AuthSecrets,
    pub stripe: Stripe,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// MiB
    pub body_limit: u64,
    /// Seconds
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

/// HS256 secrets for the two kinds of bearer tokens the API accepts.
#[derive(Debug, Clone)]
pub struct AuthSecrets {
    pub tenant_secret: String,
    pub device_secret: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    /// Unset keeps the server up; webhook deliveries then fail as misconfigured.
    pub webhook_secret: Option<String>,
    pub tolerance_seconds: i64,
}
