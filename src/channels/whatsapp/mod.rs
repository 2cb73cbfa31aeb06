//! WhatsApp Cloud API channel — webhook intake, signature check, message
//! composition and outbound transport.

pub mod composer;
pub mod routes;
pub mod signature;
pub mod transport;
pub mod webhook;

use secrecy::SecretString;

use crate::error::ConfigError;

pub use composer::{OutboundPayload, compose};
pub use routes::{AppState, webhook_routes};
pub use signature::{SIGNATURE_HEADER, sign, verify_signature};
pub use transport::{Delivery, DeliveryReceipt, RecordingTransport, Transport, WhatsAppClient};
pub use webhook::{WebhookPayload, parse_payload};

pub const DEFAULT_API_VERSION: &str = "v20.0";
pub const DEFAULT_API_BASE_URL: &str = "https://graph.facebook.com";

/// WhatsApp channel configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// Token echoed back during the webhook verification handshake.
    pub verify_token: SecretString,
    /// App secret for `X-Hub-Signature-256`. Unset disables the check.
    pub app_secret: Option<SecretString>,
    pub access_token: Option<SecretString>,
    pub phone_number_id: Option<String>,
    pub api_version: String,
    pub api_base_url: String,
}

impl WhatsAppConfig {
    /// Build config from environment variables.
    ///
    /// `WEBHOOK_VERIFY_TOKEN` is required; everything else is optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let verify_token = std::env::var("WEBHOOK_VERIFY_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("WEBHOOK_VERIFY_TOKEN".into()))?;

        let secret = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|s| !s.is_empty())
                .map(SecretString::from)
        };

        Ok(Self {
            verify_token: SecretString::from(verify_token),
            app_secret: secret("META_APP_SECRET"),
            access_token: secret("META_ACCESS_TOKEN"),
            phone_number_id: std::env::var("META_PHONE_NUMBER_ID")
                .ok()
                .filter(|s| !s.is_empty()),
            api_version: std::env::var("META_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            api_base_url: std::env::var("META_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            verify_token: SecretString::from("verify-me"),
            app_secret: None,
            access_token: None,
            phone_number_id: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}
