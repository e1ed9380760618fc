//! Gateway
//!
//! Composition root of the relay. Transport tasks report connects, frames and
//! disconnects here; the gateway is the only writer to the [`Registry`].

use crate::connection::{deliver_all, Connection, Registry, RegistryError};
use crate::notify::NotificationSink;
use crate::presence::PresenceNotifier;
use crate::protocol::{PresenceSnapshot, ServerEnvelope};
use crate::routing::{RouteOutcome, Router};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Default per-connection outbound queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Relay core: registry, router and presence wired together
#[derive(Debug)]
pub struct Gateway {
    registry: Arc<Registry>,
    router: Router,
    presence: PresenceNotifier,
    queue_capacity: usize,
}

impl Gateway {
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        let registry = Registry::new_shared();
        let presence = PresenceNotifier::new(registry.clone());
        let router = Router::new(registry.clone(), presence.clone());

        Self {
            registry,
            router,
            presence,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Route copies of every delivered message to `sink`
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.router = self.router.with_sink(sink);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Open connections right now
    pub fn connection_count(&self) -> usize {
        self.registry.open_count()
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        self.presence.snapshot()
    }

    /// Create an outbound queue sized for this gateway and register it
    pub fn connect(
        &self,
    ) -> Result<(Arc<Connection>, mpsc::Receiver<ServerEnvelope>), RegistryError> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let connection = self.on_connect(tx)?;
        Ok((connection, rx))
    }

    /// Register a new connection and announce the updated roster.
    ///
    /// The new client receives the roster that includes itself.
    pub fn on_connect(
        &self,
        sender: mpsc::Sender<ServerEnvelope>,
    ) -> Result<Arc<Connection>, RegistryError> {
        let connection = Connection::new(Connection::generate_id(), sender);

        self.registry.add(connection.clone())?;
        connection.open();

        tracing::info!(
            connection_id = %connection.id(),
            total_clients = self.registry.open_count(),
            "Client connected"
        );

        self.presence.announce();
        Ok(connection)
    }

    /// Handle one inbound text frame
    pub fn on_message(&self, connection_id: &str, frame: &str) -> RouteOutcome {
        let open = self
            .registry
            .find_by_id(connection_id)
            .is_some_and(|conn| conn.is_open());

        if !open {
            tracing::debug!(connection_id = %connection_id, "Frame from inactive connection ignored");
            return RouteOutcome::Ignored;
        }

        self.router.dispatch(connection_id, frame)
    }

    /// Remove a connection and announce the updated roster.
    ///
    /// Returns `false` if the connection was already gone.
    pub fn on_disconnect(&self, connection_id: &str) -> bool {
        let Some(connection) = self.registry.remove(connection_id) else {
            return false;
        };

        tracing::info!(
            connection_id = %connection_id,
            name = ?connection.display_name(),
            overflowed = connection.overflowed(),
            connected_ms = connection.age().as_millis(),
            total_clients = self.registry.open_count(),
            "Client disconnected"
        );

        self.presence.announce();
        true
    }

    /// Queue an envelope on every open connection
    pub fn broadcast(&self, envelope: &ServerEnvelope) -> usize {
        deliver_all(&self.registry.connections(), envelope)
    }

    /// Close every connection. Transport tasks observe the close and exit.
    pub fn shutdown(&self) -> usize {
        let closed = self.registry.drain().len();
        tracing::info!(connections = closed, "Gateway shut down");
        closed
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
