//! # relay-gateway
//!
//! Real-time message relay over WebSocket.
//!
//! Clients connect, optionally register a display name, and exchange direct or
//! group messages. The [`Gateway`] owns the [`Registry`] of live connections,
//! hands inbound frames to the [`Router`], and keeps every client informed of
//! the current roster through the [`PresenceNotifier`].

pub mod connection;
pub mod gateway;
pub mod notify;
pub mod presence;
pub mod protocol;
pub mod routing;
pub mod server;

pub use connection::{deliver_all, Connection, ConnectionState, Registry, RegistryError, SendError};
pub use gateway::{Gateway, DEFAULT_QUEUE_CAPACITY};
pub use notify::{NoopSink, NotificationSink, NotifyError, RouteKind, RoutedMessage, WebhookSink};
pub use presence::PresenceNotifier;
pub use protocol::{ChatPayload, EnvelopeError, EventKind, InboundEnvelope, PresenceSnapshot, ServerEnvelope};
pub use routing::{RouteOutcome, Router};
pub use server::{create_app, create_router, GatewayState, WS_PATH};
