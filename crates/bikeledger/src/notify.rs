//! Outbound messages to buyers and operators.
//!
//! Delivery is fire-and-forget: a [`Notifier`] reports whether the message
//! was handed off, and nothing is tracked afterwards.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;

/// A message for a phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The buyer's registration certificate can be collected.
    DocumentReady {
        /// Buyer's phone number.
        phone: String,
        /// The bike the certificate belongs to.
        bike_number: String,
    },
    /// A login code for the operator.
    OneTimeCode {
        /// Operator's phone number.
        phone: String,
        /// The code.
        code: String,
    },
}

impl Notification {
    /// Recipient phone number.
    #[must_use]
    pub fn phone(&self) -> &str {
        match self {
            Self::DocumentReady { phone, .. } | Self::OneTimeCode { phone, .. } => phone,
        }
    }

    /// Text of the message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::DocumentReady { bike_number, .. } => {
                format!("RC card for bike {bike_number} is ready for pickup")
            }
            Self::OneTimeCode { code, .. } => {
                format!("Your bikeledger login code is {code}")
            }
        }
    }
}

/// Something that can deliver a [`Notification`].
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Name of this notifier (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Hand the notification off. Returns whether that succeeded.
    async fn send(&self, notification: &Notification) -> bool;
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, notification: &Notification) -> bool {
        info!(
            "Notification to {}: {}",
            notification.phone(),
            notification.message()
        );
        true
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    message: String,
}

/// POSTs `{to, message}` JSON to a webhook, such as an SMS gateway.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier for `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, notification: &Notification) -> bool {
        let payload = WebhookPayload {
            to: notification.phone(),
            message: notification.message(),
        };

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Webhook accepted notification for {}", payload.to);
                true
            }
            Ok(response) => {
                warn!("Webhook rejected notification: HTTP {}", response.status());
                false
            }
            Err(e) => {
                warn!("Webhook request failed: {e}");
                false
            }
        }
    }
}

/// The webhook notifier when a URL is configured, otherwise the log.
///
/// # Errors
///
/// Returns an error if the webhook HTTP client cannot be built.
pub fn notifier_from_config(config: &Config) -> Result<Arc<dyn Notifier>> {
    match config
        .notify
        .webhook_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
    {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(url, config.notify_timeout())?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn ready() -> Notification {
        Notification::DocumentReady {
            phone: "+919876543210".to_string(),
            bike_number: "KA05MN7777".to_string(),
        }
    }

    #[test]
    fn test_document_ready_message() {
        assert_eq!(
            ready().message(),
            "RC card for bike KA05MN7777 is ready for pickup"
        );
        assert_eq!(ready().phone(), "+919876543210");
    }

    #[test]
    fn test_one_time_code_message() {
        let n = Notification::OneTimeCode {
            phone: "+919876543210".to_string(),
            code: "042517".to_string(),
        };
        assert!(n.message().ends_with("042517"));
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        crate::logging::init_test_logging();
        assert!(LogNotifier.send(&ready()).await);
    }

    #[tokio::test]
    async fn test_webhook_posts_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sms"))
            .and(body_json(json!({
                "to": "+919876543210",
                "message": "RC card for bike KA05MN7777 is ready for pickup"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            WebhookNotifier::new(format!("{}/sms", server.uri()), Duration::from_secs(5)).unwrap();
        assert!(notifier.send(&ready()).await);
    }

    #[tokio::test]
    async fn test_webhook_failure_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), Duration::from_secs(5)).unwrap();
        assert!(!notifier.send(&ready()).await);
    }

    #[tokio::test]
    async fn test_webhook_unreachable_returns_false() {
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/sms", Duration::from_secs(2)).unwrap();
        assert!(!notifier.send(&ready()).await);
    }

    #[test]
    fn test_notifier_from_config() {
        let mut config = Config::default();
        assert_eq!(notifier_from_config(&config).unwrap().name(), "log");

        config.notify.webhook_url = Some("  ".to_string());
        assert_eq!(notifier_from_config(&config).unwrap().name(), "log");

        config.notify.webhook_url = Some("https://sms.example.com/send".to_string());
        assert_eq!(notifier_from_config(&config).unwrap().name(), "webhook");
    }
}
