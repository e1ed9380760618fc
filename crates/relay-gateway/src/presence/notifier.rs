//! Roster broadcasts
//!
//! Pushes an `info` envelope to every open connection after membership or
//! naming changes. Message traffic never triggers an announcement.

use crate::connection::{deliver_all, Registry};
use crate::protocol::{PresenceSnapshot, ServerEnvelope};
use parking_lot::Mutex;
use std::sync::Arc;

/// Emits presence snapshots derived from the registry
#[derive(Debug, Clone)]
pub struct PresenceNotifier {
    registry: Arc<Registry>,
    /// Held from snapshot to enqueue so rosters reach every queue in the
    /// order they were taken. Shared by all clones.
    announce_lock: Arc<Mutex<()>>,
}

impl PresenceNotifier {
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            announce_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current roster without sending it anywhere
    pub fn snapshot(&self) -> PresenceSnapshot {
        self.registry.snapshot()
    }

    /// Send the current roster to every open connection.
    ///
    /// The snapshot is built from the same connection list it is sent to, so
    /// every recipient sees itself counted. Returns the number of recipients.
    pub fn announce(&self) -> usize {
        let _guard = self.announce_lock.lock();

        let connections = self.registry.connections();
        let snapshot = PresenceSnapshot::new(connections.iter().map(|c| c.label()).collect());
        let total = snapshot.total_clients;

        let sent = deliver_all(&connections, &ServerEnvelope::Info(snapshot));

        tracing::debug!(total_clients = total, recipients = sent, "Presence announced");
        sent
    }
}
