//! Server-emitted envelopes

use super::EventKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of a routed chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    /// Target as the sender addressed it (direct messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    /// Sender's display name, or its connection id when unregistered
    pub from: String,

    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

/// Point-in-time roster pushed to every client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    pub total_clients: usize,
    /// Display name (or id) of each live connection, in join order
    pub clients: Vec<String>,
}

impl PresenceSnapshot {
    #[must_use]
    pub fn new(clients: Vec<String>) -> Self {
        Self {
            total_clients: clients.len(),
            clients,
        }
    }
}

/// Envelope sent from the relay to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ServerEnvelope {
    Message(ChatPayload),
    GroupMessage(ChatPayload),
    Info(PresenceSnapshot),
}

impl ServerEnvelope {
    /// The `event` tag this envelope serializes with
    #[must_use]
    pub fn event(&self) -> EventKind {
        match self {
            Self::Message(_) => EventKind::Message,
            Self::GroupMessage(_) => EventKind::GroupMessage,
            Self::Info(_) => EventKind::Info,
        }
    }

    /// Chat body, if this is a message envelope
    #[must_use]
    pub fn chat(&self) -> Option<&ChatPayload> {
        match self {
            Self::Message(payload) | Self::GroupMessage(payload) => Some(payload),
            Self::Info(_) => None,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl fmt::Display for ServerEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(p) | Self::GroupMessage(p) => {
                write!(f, "ServerEnvelope(event={}, from={}", self.event(), p.from)?;
                if let Some(to) = &p.to {
                    write!(f, ", to={to}")?;
                }
                write!(f, ")")
            }
            Self::Info(snapshot) => {
                write!(f, "ServerEnvelope(event=info, total={})", snapshot.total_clients)
            }
        }
    }
}
