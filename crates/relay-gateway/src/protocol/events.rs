//! Envelope event tags

use std::fmt;

/// The `event` tag of a wire envelope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Client claims a display name
    Register,
    /// Direct message when `to` is set, broadcast otherwise
    Message,
    /// Broadcast to every live connection
    GroupMessage,
    /// Presence roster, server to client only
    Info,
    /// Anything else; ignored by the router
    Unknown(String),
}

impl EventKind {
    /// Parse an `event` tag. Unrecognised tags are kept as `Unknown`.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            "register" => Self::Register,
            "message" => Self::Message,
            "groupmessage" => Self::GroupMessage,
            "info" => Self::Info,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Wire representation of the tag
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Register => "register",
            Self::Message => "message",
            Self::GroupMessage => "groupmessage",
            Self::Info => "info",
            Self::Unknown(tag) => tag,
        }
    }

    /// Whether this event carries a chat body
    #[must_use]
    pub fn carries_text(&self) -> bool {
        matches!(self, Self::Message | Self::GroupMessage)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
