// # Webhook Notifier
//
// Posts run notifications to a chat webhook using the Slack-compatible
// body `{"text": "..."}` (also accepted by Mattermost, Rocket.Chat and
// Google Chat).
//
// Delivery is best effort: failures are logged at `warn` and never reach
// the reconciler.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use v6sync_core::traits::Notifier;
use v6sync_core::{Error, Result};

/// Timeout for one delivery attempt
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Webhook request body
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub text: &'a str,
}

/// Notifier posting to an incoming webhook
pub struct WebhookNotifier {
    /// Webhook URL
    /// ⚠️ The path usually embeds a secret; only the host is ever logged
    url: reqwest::Url,
    client: reqwest::Client,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("host", &self.host())
            .finish()
    }
}

impl WebhookNotifier {
    /// Create a notifier for an `http(s)` webhook URL
    ///
    /// # Errors
    ///
    /// `Error::Config` if the URL does not parse or is not HTTP(S).
    pub fn new(url: &str) -> Result<Self> {
        let url = reqwest::Url::parse(url.trim())
            .map_err(|e| Error::config(format!("Invalid webhook URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Webhook URL must be http(s), got '{}'",
                url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { url, client })
    }

    /// Host part of the webhook URL
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or("<none>")
    }

    async fn deliver(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload { text })
            .send()
            .await
            .map_err(|e| Error::http(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::collaborator(
                "webhook",
                format!("{} answered {status}", self.host()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, text: &str) {
        match self.deliver(text).await {
            Ok(()) => tracing::debug!("Notification delivered to {}", self.host()),
            Err(e) => tracing::warn!("Notification to {} failed: {}", self.host(), e),
        }
    }
}
