//! Outbound notifications.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use whatsapp_client::{mask_phone, WhatsAppClient};

/// Best-effort message delivery. Failures are reported as `false`, never raised.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, phone: &str, text: &str) -> bool;
}

/// Delivers through the WhatsApp gateway with a bounded wait.
#[derive(Clone)]
pub struct WhatsAppNotifier {
    client: WhatsAppClient,
    timeout: Duration,
}

impl WhatsAppNotifier {
    pub fn new(client: WhatsAppClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    async fn send_message(&self, phone: &str, text: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.client.send_text(phone, text)).await {
            Ok(Ok(_)) => {
                debug!(phone = %mask_phone(phone), "Notification sent");
                true
            }
            Ok(Err(e)) => {
                warn!(phone = %mask_phone(phone), "Notification failed: {}", e);
                false
            }
            Err(_) => {
                warn!(phone = %mask_phone(phone), "Notification timed out after {:?}", self.timeout);
                false
            }
        }
    }
}

/// Used when no gateway is configured; drops every message.
#[derive(Debug, Clone, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send_message(&self, phone: &str, _text: &str) -> bool {
        debug!(phone = %mask_phone(phone), "Messaging disabled, notification dropped");
        false
    }
}

/// Send `text` to every recipient concurrently. Returns how many succeeded.
pub async fn broadcast(notifier: &Arc<dyn Notifier>, recipients: &[String], text: &str) -> usize {
    let sends = recipients
        .iter()
        .map(|phone| notifier.send_message(phone, text));

    join_all(sends).await.into_iter().filter(|ok| *ok).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_broadcast_counts_successes() {
        let mut mock = MockNotifier::new();
        mock.expect_send_message()
            .with(eq("919000000001"), eq("hello"))
            .times(1)
            .returning(|_, _| true);
        mock.expect_send_message()
            .with(eq("919000000002"), eq("hello"))
            .times(1)
            .returning(|_, _| false);

        let notifier: Arc<dyn Notifier> = Arc::new(mock);
        let staff = vec!["919000000001".to_string(), "919000000002".to_string()];

        assert_eq!(broadcast(&notifier, &staff, "hello").await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_to_nobody() {
        let notifier: Arc<dyn Notifier> = Arc::new(DisabledNotifier);
        assert_eq!(broadcast(&notifier, &[], "hello").await, 0);
    }

    #[tokio::test]
    async fn test_whatsapp_notifier_reports_gateway_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/venue"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client =
            WhatsAppClient::new(mock_server.uri(), "key", "venue", Duration::from_secs(5)).unwrap();
        let notifier = WhatsAppNotifier::new(client, Duration::from_secs(5));

        assert!(!notifier.send_message("919876543210", "hi").await);
    }

    #[tokio::test]
    async fn test_whatsapp_notifier_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/venue"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let client =
            WhatsAppClient::new(mock_server.uri(), "key", "venue", Duration::from_secs(10)).unwrap();
        let notifier = WhatsAppNotifier::new(client, Duration::from_millis(100));

        assert!(!notifier.send_message("919876543210", "hi").await);
    }

    #[tokio::test]
    async fn test_whatsapp_notifier_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/venue"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "key": { "id": "ABC", "remoteJid": "919876543210@s.whatsapp.net" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            WhatsAppClient::new(mock_server.uri(), "key", "venue", Duration::from_secs(5)).unwrap();
        let notifier = WhatsAppNotifier::new(client, Duration::from_secs(5));

        assert!(notifier.send_message("919876543210", "hi").await);
    }
}
