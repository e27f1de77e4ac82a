use std::sync::Arc;

use anyhow::Result as AnyResult;
use chrono::{DateTime, Utc};
use crates::{
    domain::{
        entities::device_licenses::{InsertDeviceLicenseEntity, PENDING_ACTIVATION_NOTE},
        repositories::{LicensingStore, LicensingUnitOfWork},
        value_objects::{
            enums::{
                device_license_statuses::DeviceLicenseStatus,
                webhook_event_statuses::WebhookEventStatus,
            },
            license_webhook::{LicensePurchaseOutcome, WebhookDisposition},
            payment_events::{CheckoutCompleted, PaymentEvent},
        },
    },
    observability::{LicenseAlertNotifier, WebhookFailureAlert},
    payments::stripe_client::{StripeClient, VerifiedWebhook, WebhookVerificationError},
};
use tracing::{error, info, warn};

use super::licensing_errors::WebhookError;

pub const STRIPE_LICENSE_SOURCE: &str = "STRIPE_CHECKOUT";

#[cfg_attr(test, mockall::automock)]
pub trait PaymentGateway: Send + Sync {
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedWebhook, WebhookVerificationError>;
}

impl PaymentGateway for StripeClient {
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedWebhook, WebhookVerificationError> {
        self.verify_webhook_signature(payload, signature, now)
    }
}

/// Why a checkout could not become a license.
enum PurchaseFailure {
    /// Retrying the same event can never succeed.
    Unprocessable(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for PurchaseFailure {
    fn from(value: anyhow::Error) -> Self {
        PurchaseFailure::Internal(value)
    }
}

/// Turns verified payment processor events into per-device licenses, exactly once per event id.
pub struct DeviceLicenseWebhookUseCase<U, G>
where
    U: LicensingUnitOfWork + 'static,
    G: PaymentGateway + 'static,
{
    unit_of_work: Arc<U>,
    gateway: Arc<G>,
    alerts: Arc<LicenseAlertNotifier>,
}

impl<U, G> DeviceLicenseWebhookUseCase<U, G>
where
    U: LicensingUnitOfWork + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(unit_of_work: Arc<U>, gateway: Arc<G>, alerts: Arc<LicenseAlertNotifier>) -> Self {
        Self {
            unit_of_work,
            gateway,
            alerts,
        }
    }

    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookDisposition, WebhookError> {
        let now = Utc::now();

        let verified = self
            .gateway
            .verify_webhook(payload, signature.unwrap_or_default(), now)
            .map_err(|err| {
                let err = match err {
                    WebhookVerificationError::MissingSecret => {
                        WebhookError::Configuration(err.to_string())
                    }
                    WebhookVerificationError::MalformedPayload(reason) => {
                        WebhookError::InvalidPayload(reason)
                    }
                    other => WebhookError::InvalidSignature(other.to_string()),
                };
                warn!(
                    status = err.status_code().as_u16(),
                    error = %err,
                    "license_webhook: delivery rejected before processing"
                );
                err
            })?;

        let external_event_id = verified.event.id.clone();
        let event_type = verified.event.type_.clone();
        let payment_event = verified.event.payment_event();
        let payload = verified.payload;
        info!(
            %external_event_id,
            %event_type,
            livemode = ?verified.event.livemode,
            "license_webhook: processing event"
        );

        let result = {
            let external_event_id = external_event_id.clone();
            let payload = payload.clone();
            self.unit_of_work
                .transaction(move |store| {
                    settle_event(store, &external_event_id, &payment_event, &payload, now)
                })
                .await
        };

        match result {
            Ok(disposition) => {
                self.report(&external_event_id, &event_type, &disposition, now);
                Ok(disposition)
            }
            Err(err) => {
                error!(
                    %external_event_id,
                    %event_type,
                    db_error = ?err,
                    "license_webhook: processing failed, rolled back"
                );
                self.record_failure(&external_event_id, &event_type, payload, &err, now)
                    .await;
                Err(WebhookError::Internal(err))
            }
        }
    }

    fn report(
        &self,
        external_event_id: &str,
        event_type: &str,
        disposition: &WebhookDisposition,
        now: DateTime<Utc>,
    ) {
        match disposition {
            WebhookDisposition::Duplicate => {
                info!(%external_event_id, "license_webhook: duplicate delivery acknowledged")
            }
            WebhookDisposition::Ignored { event_type } => {
                info!(%external_event_id, %event_type, "license_webhook: event type ignored")
            }
            WebhookDisposition::Processed(outcome) => info!(
                %external_event_id,
                device_license_id = %outcome.device_license_id,
                device_id = %outcome.device_id,
                tenant_id = %outcome.tenant_id,
                deferred = outcome.deferred,
                ends_at = %outcome.ends_at,
                "license_webhook: device license recorded"
            ),
            WebhookDisposition::Rejected { reason } => {
                warn!(
                    %external_event_id,
                    %reason,
                    "license_webhook: event recorded as failed"
                );
                self.alert(WebhookFailureAlert {
                    external_event_id: external_event_id.to_string(),
                    event_type: event_type.to_string(),
                    reason: reason.clone(),
                    retryable: false,
                    occurred_at: now,
                });
            }
        }
    }

    async fn record_failure(
        &self,
        external_event_id: &str,
        event_type: &str,
        payload: serde_json::Value,
        err: &anyhow::Error,
        now: DateTime<Utc>,
    ) {
        let reason = format!("{err:#}");

        let recorded: AnyResult<()> = {
            let external_event_id = external_event_id.to_string();
            let event_type = event_type.to_string();
            let reason = reason.clone();
            self.unit_of_work
                .transaction(move |store| {
                    store.record_webhook_failure(
                        &external_event_id,
                        &event_type,
                        &payload,
                        &reason,
                        now,
                    )
                })
                .await
        };
        if let Err(record_err) = recorded {
            error!(
                %external_event_id,
                db_error = ?record_err,
                "license_webhook: failed to record processing failure"
            );
        }

        self.alert(WebhookFailureAlert {
            external_event_id: external_event_id.to_string(),
            event_type: event_type.to_string(),
            reason,
            retryable: true,
            occurred_at: now,
        });
    }

    fn alert(&self, alert: WebhookFailureAlert) {
        if !self.alerts.is_enabled() {
            return;
        }
        let alerts = Arc::clone(&self.alerts);
        tokio::spawn(async move { alerts.notify_webhook_failure(&alert).await });
    }
}

/// Claims the event id and settles it. Runs as one transaction, so the claim commits together
/// with the license it produced or not at all.
fn settle_event(
    store: &mut dyn LicensingStore,
    external_event_id: &str,
    event: &PaymentEvent,
    payload: &serde_json::Value,
    now: DateTime<Utc>,
) -> AnyResult<WebhookDisposition> {
    if !store.claim_webhook_event(external_event_id, event.event_type(), payload, now)? {
        return Ok(WebhookDisposition::Duplicate);
    }

    let failure = match event {
        PaymentEvent::Unrecognized { event_type } => {
            store.settle_webhook_event(
                external_event_id,
                WebhookEventStatus::Ignored,
                None,
                None,
                now,
            )?;
            return Ok(WebhookDisposition::Ignored {
                event_type: event_type.clone(),
            });
        }
        PaymentEvent::Unparsed { reason, .. } => format!("unreadable checkout session: {reason}"),
        PaymentEvent::CheckoutCompleted(session) => {
            match record_license_purchase(store, session, now) {
                Ok(outcome) => {
                    store.settle_webhook_event(
                        external_event_id,
                        WebhookEventStatus::Processed,
                        Some(serde_json::to_value(&outcome)?),
                        None,
                        now,
                    )?;
                    return Ok(WebhookDisposition::Processed(outcome));
                }
                Err(PurchaseFailure::Internal(err)) => return Err(err),
                Err(PurchaseFailure::Unprocessable(reason)) => reason,
            }
        }
    };

    store.settle_webhook_event(
        external_event_id,
        WebhookEventStatus::Failed,
        None,
        Some(failure.clone()),
        now,
    )?;
    Ok(WebhookDisposition::Rejected { reason: failure })
}

/// Creates the device license a completed checkout paid for.
///
/// A device that was never online gets a zero-length pending license that starts on its first
/// heartbeat. Otherwise the new window starts where the device's running time ends.
fn record_license_purchase(
    store: &mut dyn LicensingStore,
    session: &CheckoutCompleted,
    now: DateTime<Utc>,
) -> Result<LicensePurchaseOutcome, PurchaseFailure> {
    let purchase = session
        .license_purchase()
        .map_err(|err| PurchaseFailure::Unprocessable(err.to_string()))?;

    let device = store
        .lock_device(purchase.device_id)?
        .filter(|device| device.tenant_id == purchase.tenant_id)
        .ok_or_else(|| {
            PurchaseFailure::Unprocessable(format!(
                "device {} does not belong to tenant {}",
                purchase.device_id, purchase.tenant_id
            ))
        })?;

    let deferred = !device.has_been_online();
    let (starts_at, ends_at, note) = if deferred {
        (now, now, Some(PENDING_ACTIVATION_NOTE.to_string()))
    } else {
        let running_until = store
            .find_latest_running_license(device.id)?
            .map(|license| license.ends_at);
        let base = running_until.filter(|end| *end > now).unwrap_or(now);
        (base, base + purchase.license_type.duration(), None)
    };

    let device_license_id = store.insert_device_license(InsertDeviceLicenseEntity {
        tenant_id: purchase.tenant_id,
        device_id: device.id,
        type_: purchase.license_type.to_string(),
        status: DeviceLicenseStatus::Active.to_string(),
        starts_at,
        ends_at,
        source: STRIPE_LICENSE_SOURCE.to_string(),
        note,
        provider_session_ref: session.id.clone(),
        provider_payment_id: session.payment_intent.clone(),
        amount_cents: session.amount_total,
        currency: session.currency.clone(),
        purchased_by: purchase.user_id,
        created_at: now,
    })?;

    Ok(LicensePurchaseOutcome {
        device_license_id,
        device_id: device.id,
        tenant_id: purchase.tenant_id,
        license_type: purchase.license_type.to_string(),
        deferred,
        starts_at,
        ends_at,
    })
}
