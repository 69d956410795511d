use anyhow::Result;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ── Webhook Event Types ───────────────────────────────────────

/// A structured event payload sent to webhook endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    /// Event type identifier, e.g. "booking_approved".
    pub event_type: String,
    /// RFC 3339 timestamp of when the event occurred.
    pub timestamp: String,
    pub booking_id: Uuid,
    pub room: String,
    /// Event-specific details.
    pub details: serde_json::Value,
}

impl WebhookEvent {
    fn new(event_type: &str, booking_id: Uuid, room: &str, details: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            booking_id,
            room: room.to_string(),
            details,
        }
    }

    pub fn booking_approved(booking_id: Uuid, room: &str, classroom_updated: bool) -> Self {
        Self::new(
            "booking_approved",
            booking_id,
            room,
            serde_json::json!({ "classroom_updated": classroom_updated }),
        )
    }

    pub fn booking_rejected(booking_id: Uuid, room: &str) -> Self {
        Self::new("booking_rejected", booking_id, room, serde_json::json!({}))
    }

    pub fn classroom_update_failed(booking_id: Uuid, room: &str, repair_queued: bool) -> Self {
        Self::new(
            "classroom_update_failed",
            booking_id,
            room,
            serde_json::json!({ "repair_queued": repair_queued }),
        )
    }
}

// ── HMAC Signing ─────────────────────────────────────────────

/// HMAC-SHA256 of `payload`, formatted as "sha256=<hex>".
fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid webhook signing key: {}", e))?;
    mac.update(payload);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

// ── Webhook Notifier ──────────────────────────────────────────

/// Dispatches webhook events to the configured URLs.
/// Delivery is retried with back-off; store writes are never retried here.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    urls: Vec<String>,
    secret: Option<String>,
    backoff: Vec<Duration>,
}

impl WebhookNotifier {
    pub fn new(urls: Vec<String>, secret: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("campus-admin-webhook/1.0")
            .build()?;
        Ok(Self {
            client,
            urls,
            secret,
            backoff: [0, 1, 5].into_iter().map(Duration::from_secs).collect(),
        })
    }

    /// Replaces the delay schedule (one entry per attempt).
    pub fn with_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.urls.is_empty()
    }

    /// Send one event to one URL, retrying per the back-off schedule.
    pub async fn send(&self, url: &str, event: &WebhookEvent) -> Result<()> {
        let payload = serde_json::to_vec(event)?;
        let delivery_id = Uuid::new_v4().to_string();
        let signature = match &self.secret {
            Some(s) => Some(hmac_sha256_hex(s, &payload)?),
            None => None,
        };

        for (attempt, delay) in self.backoff.iter().enumerate() {
            if !delay.is_zero() {
                debug!(url, attempt, delay_ms = delay.as_millis() as u64, "retrying webhook delivery");
                tokio::time::sleep(*delay).await;
            }

            let mut req = self
                .client
                .post(url)
                .header("content-type", "application/json")
                .header("x-campus-delivery-id", &delivery_id)
                .header("x-campus-event", &event.event_type);
            if let Some(ref sig) = signature {
                req = req.header("x-campus-signature", sig.as_str());
            }

            match req.body(payload.clone()).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!(
                        url,
                        event_type = %event.event_type,
                        delivery_id = %delivery_id,
                        attempt,
                        "webhook delivered"
                    );
                    return Ok(());
                }
                Ok(resp) => {
                    warn!(
                        url,
                        event_type = %event.event_type,
                        attempt,
                        status = %resp.status(),
                        "webhook delivery failed (non-2xx)"
                    );
                }
                Err(e) => {
                    warn!(url, event_type = %event.event_type, attempt, error = %e, "webhook request error");
                }
            }
        }

        anyhow::bail!(
            "webhook delivery failed after {} attempts: {}",
            self.backoff.len(),
            url
        )
    }

    /// Fire-and-forget delivery to every configured URL.
    pub fn dispatch(&self, event: WebhookEvent) {
        if !self.is_enabled() {
            return;
        }
        let notifier = self.clone();
        tokio::spawn(async move {
            for url in &notifier.urls {
                if let Err(e) = notifier.send(url, &event).await {
                    warn!(url, error = %e, "webhook dispatch ultimately failed");
                }
            }
        });
    }
}
