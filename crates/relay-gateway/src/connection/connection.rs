//! A single relay connection
//!
//! Owns the outbound half of one WebSocket: a bounded queue drained by the
//! socket's writer task.

use crate::protocol::ServerEnvelope;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, Notify};

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, not yet announced
    Connecting,
    /// Registered and receiving traffic
    Open,
    /// Terminal
    Closed,
}

/// Failure to queue an envelope for a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection is closed or its writer is gone
    #[error("connection closed")]
    Closed,

    /// The outbound queue was full; the connection has been closed
    #[error("outbound queue full")]
    Full,
}

/// One live client channel
pub struct Connection {
    /// Server-assigned identifier
    id: String,

    /// Trimmed display name, set through the registry
    display_name: RwLock<Option<String>>,

    state: RwLock<ConnectionState>,

    /// Bounded outbound queue
    sender: mpsc::Sender<ServerEnvelope>,

    /// Set when the peer fell too far behind
    overflowed: AtomicBool,

    /// Wakes the transport task once the connection is closed
    closed: Notify,

    created_at: Instant,
}

impl Connection {
    /// Create a new connection in the `Connecting` state
    pub fn new(id: impl Into<String>, sender: mpsc::Sender<ServerEnvelope>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            display_name: RwLock::new(None),
            state: RwLock::new(ConnectionState::Connecting),
            sender,
            overflowed: AtomicBool::new(false),
            closed: Notify::new(),
            created_at: Instant::now(),
        })
    }

    /// Generate a fresh connection id
    #[must_use]
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> Option<String> {
        self.display_name.read().clone()
    }

    /// Only the registry renames connections, under its own lock.
    pub(crate) fn set_display_name(&self, name: String) {
        *self.display_name.write() = Some(name);
    }

    /// Whether this connection currently goes by `name`
    pub fn has_name(&self, name: &str) -> bool {
        self.display_name.read().as_deref() == Some(name)
    }

    /// Display name if registered, otherwise the connection id
    pub fn label(&self) -> String {
        self.display_name().unwrap_or_else(|| self.id.clone())
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Move `Connecting → Open`. No effect on a closed connection.
    pub(crate) fn open(&self) {
        let mut state = self.state.write();
        if *state == ConnectionState::Connecting {
            *state = ConnectionState::Open;
        }
    }

    /// Move to `Closed` and wake the transport task.
    ///
    /// Returns `false` if the connection was already closed.
    pub fn close(&self) -> bool {
        {
            let mut state = self.state.write();
            if *state == ConnectionState::Closed {
                return false;
            }
            *state = ConnectionState::Closed;
        }

        self.closed.notify_one();
        true
    }

    /// Resolves once the connection has been closed
    pub async fn closed(&self) {
        if self.is_closed() {
            return;
        }
        self.closed.notified().await;
    }

    /// Whether the connection was closed because its queue overflowed
    pub fn overflowed(&self) -> bool {
        self.overflowed.load(Ordering::SeqCst)
    }

    /// Queue an envelope without waiting.
    ///
    /// A full queue closes the connection: a peer that cannot keep up is
    /// dropped rather than allowed to stall everyone else.
    pub fn send(&self, envelope: ServerEnvelope) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }

        match self.sender.try_send(envelope) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.overflowed.store(true, Ordering::SeqCst);
                tracing::warn!(
                    connection_id = %self.id,
                    capacity = self.sender.max_capacity(),
                    "Outbound queue full, closing connection"
                );
                self.close();
                Err(SendError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.close();
                Err(SendError::Closed)
            }
        }
    }

    /// Time since the connection was accepted
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("display_name", &self.display_name())
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Queue `envelope` on every connection, returning how many accepted it
pub fn deliver_all<'a, I>(connections: I, envelope: &ServerEnvelope) -> usize
where
    I: IntoIterator<Item = &'a Arc<Connection>>,
{
    let mut sent = 0;

    for conn in connections {
        match conn.send(envelope.clone()) {
            Ok(()) => sent += 1,
            Err(e) => {
                tracing::debug!(connection_id = %conn.id(), error = %e, "Delivery skipped");
            }
        }
    }

    sent
}
