//! Result of routing one inbound frame

use crate::connection::RegistryError;
use std::fmt;

/// What the router did with a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Direct message queued on the target and the sender's echo
    Delivered { recipients: usize },

    /// Message fanned out to every open connection
    Broadcast { recipients: usize },

    /// No connection answers to `target`
    TargetNotFound { target: String, echoed: bool },

    /// Display name stored and roster announced
    Registered { name: String },

    /// Registration refused; the connection keeps its previous name
    RegistrationRejected(RegistryError),

    /// Frame could not be decoded or lacked required fields
    Malformed(String),

    /// `info` or unknown event from a client
    Ignored,
}

impl fmt::Display for RouteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered { recipients } => write!(f, "delivered to {recipients}"),
            Self::Broadcast { recipients } => write!(f, "broadcast to {recipients}"),
            Self::TargetNotFound { target, echoed } => {
                write!(f, "target {target} not found (echoed: {echoed})")
            }
            Self::Registered { name } => write!(f, "registered as {name}"),
            Self::RegistrationRejected(e) => write!(f, "registration rejected: {e}"),
            Self::Malformed(reason) => write!(f, "malformed: {reason}"),
            Self::Ignored => write!(f, "ignored"),
        }
    }
}
