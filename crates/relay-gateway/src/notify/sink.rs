//! Notification sink trait

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint returned status {0}")]
    Status(u16),
}

/// How a message was routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Direct,
    Broadcast,
}

/// Summary of a routed message handed to a sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedMessage {
    pub kind: RouteKind,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Number of connections the message was queued on
    pub recipients: usize,
}

/// Receives a copy of every routed message
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &'static str;

    async fn notify(&self, message: RoutedMessage) -> Result<(), NotifyError>;
}

/// Sink that discards everything. Routers start with this one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn notify(&self, _message: RoutedMessage) -> Result<(), NotifyError> {
        Ok(())
    }
}
