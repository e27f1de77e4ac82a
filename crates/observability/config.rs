use std::env;
use url::Url;

pub const LICENSE_ALERT_WEBHOOK_ENV: &str = "DISCORD_LICENSE_ALERT_WEBHOOK_URL";

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceContext {
    pub service_name: String,
    pub environment: String,
    pub component: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) license_alert_url: Option<Url>,
    /// Captured while parsing so they can be logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        let component = component.trim().to_string();

        let service_name = env_string("SERVICE_NAME").unwrap_or_else(|| component.clone());
        let environment = env_string("STAGE").unwrap_or_else(|| "unknown".to_string());

        let (license_alert_url, warnings) =
            alert_url_from_raw(env_string(LICENSE_ALERT_WEBHOOK_ENV).as_deref());

        Self {
            service_context: ServiceContext {
                service_name,
                environment,
                component,
            },
            license_alert_url,
            warnings,
        }
    }
}

pub(crate) fn alert_url_from_raw(raw: Option<&str>) -> (Option<Url>, Vec<String>) {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return (None, Vec::new());
    };

    match Url::parse(raw) {
        Ok(url) => (Some(url), Vec::new()),
        // The raw value is a secret and stays out of the warning.
        Err(err) => (
            None,
            vec![format!(
                "{LICENSE_ALERT_WEBHOOK_ENV} is invalid, license alerts disabled: {err}"
            )],
        ),
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
