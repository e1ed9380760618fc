//! Webhook sink
//!
//! POSTs each routed message as JSON to a configured URL.

use super::{NotificationSink, NotifyError, RoutedMessage};
use async_trait::async_trait;
use relay_common::WebhookConfig;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP webhook notification sink
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }

    pub fn from_config(config: &WebhookConfig) -> Result<Self, NotifyError> {
        Self::new(config.url.clone(), config.token.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, message: RoutedMessage) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.url).json(&message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        Ok(())
    }
}
