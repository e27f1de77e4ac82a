use anyhow::{Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::json;
use tracing::warn;
use url::Url;

use super::config::ServiceContext;

const DISCORD_CONTENT_LIMIT: usize = 2000;
const TRUNCATED_SUFFIX: &str = "\n… (truncated)";

/// A payment webhook that could not be turned into a license.
#[derive(Debug, Clone)]
pub struct WebhookFailureAlert {
    pub external_event_id: String,
    pub event_type: String,
    pub reason: String,
    pub retryable: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Posts license alerts to a Discord channel. Without a webhook URL every alert is dropped.
pub struct LicenseAlertNotifier {
    webhook_url: Option<Url>,
    client: Client,
    service_context: ServiceContext,
}

impl LicenseAlertNotifier {
    pub(crate) fn new(webhook_url: Option<Url>, service_context: ServiceContext) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()?;

        Ok(Self {
            webhook_url,
            client,
            service_context,
        })
    }

    pub fn disabled(service_context: ServiceContext) -> Result<Self> {
        Self::new(None, service_context)
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub async fn notify_webhook_failure(&self, alert: &WebhookFailureAlert) {
        let Some(webhook_url) = self.webhook_url.clone() else {
            return;
        };

        let content = format_failure(&self.service_context, alert);
        if let Err(err) = send_discord_webhook(&self.client, webhook_url, content).await {
            warn!(
                external_event_id = %alert.external_event_id,
                error = %err,
                "observability: failed to deliver license alert"
            );
        }
    }
}

fn format_failure(context: &ServiceContext, alert: &WebhookFailureAlert) -> String {
    let lines = [
        format!(
            "**{}** `{}` `{}` license webhook failed",
            context.service_name, context.environment, context.component
        ),
        format!(
            "`{}` event `{}` (`{}`)",
            alert
                .occurred_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            alert.external_event_id,
            alert.event_type
        ),
        format!("> {}", alert.reason.trim()),
        if alert.retryable {
            "will be retried on redelivery".to_string()
        } else {
            "acknowledged, manual review needed".to_string()
        },
    ];

    truncate_for_discord(lines.join("\n"))
}

pub(crate) async fn send_discord_webhook(
    client: &Client,
    webhook_url: Url,
    content: String,
) -> Result<()> {
    let response = client
        .post(webhook_url)
        .json(&json!({ "content": content }))
        .send()
        .await
        .map_err(sanitize_reqwest_error)?;

    if response.status().is_success() {
        return Ok(());
    }

    Err(anyhow!(
        "discord webhook returned non-success status: {}",
        response.status()
    ))
}

// reqwest errors embed the URL, which carries the webhook token.
fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("discord webhook request timed out");
    }
    if error.is_connect() {
        return anyhow!("discord webhook connection failed");
    }
    anyhow!("discord webhook request failed")
}

fn truncate_for_discord(content: String) -> String {
    if content.chars().count() <= DISCORD_CONTENT_LIMIT {
        return content;
    }

    let allowed = DISCORD_CONTENT_LIMIT.saturating_sub(TRUNCATED_SUFFIX.chars().count());
    let mut truncated: String = content.chars().take(allowed).collect();
    truncated.push_str(TRUNCATED_SUFFIX);
    truncated
}
