//! WhatsApp gateway HTTP client.

use crate::error::WhatsAppError;
use crate::types::*;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

/// Client for the gateway's text-message endpoint.
#[derive(Clone)]
pub struct WhatsAppClient {
    client: Client,
    base_url: String,
    api_key: String,
    instance: String,
}

impl WhatsAppClient {
    /// Create a new client. `timeout` bounds every request.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        instance: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WhatsAppError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            instance: instance.into(),
        })
    }

    /// Get the configured gateway instance name.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Check if the gateway answers at all.
    pub async fn health_check(&self) -> bool {
        self.client
            .get(&self.base_url)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Send a text message to a phone number.
    #[instrument(skip(self, phone, text))]
    pub async fn send_text(&self, phone: &str, text: &str) -> Result<SendTextResponse, WhatsAppError> {
        let number =
            recipient_jid(phone).ok_or_else(|| WhatsAppError::InvalidRecipient(phone.to_string()))?;

        let request = SendTextRequest {
            number,
            text: text.to_string(),
        };

        let response = self
            .client
            .post(format!(
                "{}/message/sendText/{}",
                self.base_url,
                encode(&self.instance)
            ))
            .header("apikey", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            warn!("Send failed: {}", msg);
            return Err(WhatsAppError::SendFailed(msg));
        }

        let body = response.text().await?;
        let parsed = if body.trim().is_empty() {
            SendTextResponse { key: None }
        } else {
            serde_json::from_str(&body)?
        };

        debug!("Sent message to {}", mask_phone(phone));
        Ok(parsed)
    }
}
