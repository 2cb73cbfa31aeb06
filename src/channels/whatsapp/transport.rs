//! Outbound transport — the WhatsApp Cloud API client and a recording stand-in.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::WhatsAppConfig;
use super::composer::OutboundPayload;
use crate::error::ChannelError;

/// Provider acknowledgement for one sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message_id: String,
}

/// Sends composed messages to a recipient.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(
        &self,
        to: &str,
        payload: &OutboundPayload,
    ) -> Result<DeliveryReceipt, ChannelError>;

    /// Mark an inbound message as read (blue ticks).
    async fn mark_read(&self, message_id: &str) -> Result<(), ChannelError>;
}

// ── Cloud API client ────────────────────────────────────────────────

#[derive(Serialize)]
struct SendRequest<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(flatten)]
    payload: &'a OutboundPayload,
}

#[derive(Serialize)]
struct ReadRequest<'a> {
    messaging_product: &'static str,
    status: &'static str,
    message_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

/// WhatsApp Cloud API client (`POST /{version}/{phone-number-id}/messages`).
pub struct WhatsAppClient {
    access_token: SecretString,
    phone_number_id: String,
    api_version: String,
    base_url: String,
    client: reqwest::Client,
}

impl WhatsAppClient {
    pub fn new(
        access_token: SecretString,
        phone_number_id: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            access_token,
            phone_number_id: phone_number_id.into(),
            api_version: api_version.into(),
            base_url: super::DEFAULT_API_BASE_URL.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Client for the configured credentials, if an access token and phone
    /// number id are both present.
    pub fn from_config(config: &WhatsAppConfig) -> Option<Self> {
        let token = config.access_token.clone()?;
        let phone_number_id = config.phone_number_id.clone()?;
        Some(
            Self::new(token, phone_number_id, config.api_version.clone())
                .with_base_url(config.api_base_url.clone()),
        )
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, self.phone_number_id
        )
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        body: &T,
    ) -> Result<reqwest::Response, ChannelError> {
        let resp = self
            .client
            .post(self.messages_url())
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        let reason = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(err) => match err.error.code {
                Some(code) => format!("{status}: {} (code {code})", err.error.message),
                None => format!("{status}: {}", err.error.message),
            },
            Err(_) => format!("{status}: {text}"),
        };
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ChannelError::AuthFailed {
                name: "whatsapp".into(),
                reason,
            });
        }
        Err(ChannelError::SendFailed {
            name: "whatsapp".into(),
            reason,
        })
    }
}

#[async_trait]
impl Transport for WhatsAppClient {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn deliver(
        &self,
        to: &str,
        payload: &OutboundPayload,
    ) -> Result<DeliveryReceipt, ChannelError> {
        let request = SendRequest {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            payload,
        };
        let resp = self.post(&request).await?;
        let body: SendResponse = resp
            .json()
            .await
            .map_err(|e| ChannelError::InvalidMessage(format!("send response: {e}")))?;

        let message_id = body
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| ChannelError::InvalidMessage("send response without message id".into()))?;

        debug!(to, kind = payload.kind(), %message_id, "WhatsApp message sent");
        Ok(DeliveryReceipt { message_id })
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), ChannelError> {
        self.post(&ReadRequest {
            messaging_product: "whatsapp",
            status: "read",
            message_id,
        })
        .await?;
        Ok(())
    }
}

// ── Recording transport ─────────────────────────────────────────────

/// One recorded send.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: String,
    pub payload: OutboundPayload,
}

/// Logs and keeps every delivery instead of sending it. Used for dry runs
/// when no access token is configured, and in tests.
#[derive(Default)]
pub struct RecordingTransport {
    deliveries: Mutex<Vec<Delivery>>,
    read: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    /// Deliveries addressed to `to`, in send order.
    pub async fn deliveries_to(&self, to: &str) -> Vec<OutboundPayload> {
        self.deliveries
            .lock()
            .await
            .iter()
            .filter(|d| d.to == to)
            .map(|d| d.payload.clone())
            .collect()
    }

    pub async fn read_receipts(&self) -> Vec<String> {
        self.read.lock().await.clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(
        &self,
        to: &str,
        payload: &OutboundPayload,
    ) -> Result<DeliveryReceipt, ChannelError> {
        info!(to, kind = payload.kind(), body = payload.body(), "Dry-run delivery");
        self.deliveries.lock().await.push(Delivery {
            to: to.to_string(),
            payload: payload.clone(),
        });
        Ok(DeliveryReceipt {
            message_id: format!("dry-run.{}", Uuid::new_v4()),
        })
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), ChannelError> {
        self.read.lock().await.push(message_id.to_string());
        Ok(())
    }
}
