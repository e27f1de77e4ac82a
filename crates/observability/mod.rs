mod config;
mod discord;

use anyhow::Result;
use config::ObservabilityConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use config::{LICENSE_ALERT_WEBHOOK_ENV, ServiceContext};
pub use discord::{LicenseAlertNotifier, WebhookFailureAlert};

/// Installs the global tracing subscriber and builds the license alert sink for `component`.
pub fn init_observability(component: &str) -> Result<LicenseAlertNotifier> {
    let config = ObservabilityConfig::from_env(component);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Local time so `TZ=Asia/Bangkok` shows `+07:00` in logs.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    let context = &config.service_context;
    for warning in &config.warnings {
        warn!(
            service = %context.service_name,
            environment = %context.environment,
            component = %context.component,
            warning = %warning,
            "observability: config warning"
        );
    }

    let notifier =
        LicenseAlertNotifier::new(config.license_alert_url.clone(), context.clone())?;
    info!(
        service = %context.service_name,
        environment = %context.environment,
        component = %context.component,
        license_alerts = notifier.is_enabled(),
        "observability: tracing initialized"
    );

    Ok(notifier)
}
