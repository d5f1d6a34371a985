// libs/appointment-cell/src/services/notification.rs
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::models::{Appointment, NotificationEvent};

/// Outbound notifications (owner emails). Callers treat delivery as
/// fire-and-forget: errors are logged, never returned to the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent, appointment: &Appointment) -> Result<()>;
}

/// Writes every event to the log. Used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, event: NotificationEvent, appointment: &Appointment) -> Result<()> {
        info!(
            appointment_id = %appointment.id,
            user_id = %appointment.user_id,
            status = %appointment.status,
            "Appointment notification: {:?}", event
        );
        Ok(())
    }
}

/// POSTs `{ "event", "appointment" }` to the email service.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: NotificationEvent, appointment: &Appointment) -> Result<()> {
        debug!("Sending {:?} notification for appointment {}", event, appointment.id);

        let response = self.client
            .post(&self.url)
            .json(&json!({
                "event": event,
                "appointment": appointment,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Notification webhook error ({}): {}", status, error_text));
        }

        Ok(())
    }
}
