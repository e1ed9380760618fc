//! Message router
//!
//! Decodes inbound frames and decides who receives them:
//!
//! - `register` stores a display name and re-announces the roster
//! - `message` with `to` goes to the resolved target plus an echo to the sender
//! - `groupmessage`, or `message` without `to`, goes to every open connection
//! - `info` and unknown events are dropped
//!
//! The sender is always stamped by the router from its own connection.

use super::RouteOutcome;
use crate::connection::{deliver_all, Connection, Registry, RegistryError};
use crate::notify::{NoopSink, NotificationSink, RouteKind, RoutedMessage};
use crate::presence::PresenceNotifier;
use crate::protocol::{ChatPayload, EventKind, InboundEnvelope, ServerEnvelope};
use std::sync::Arc;

/// Routes decoded envelopes through the registry
#[derive(Clone)]
pub struct Router {
    registry: Arc<Registry>,
    presence: PresenceNotifier,
    sink: Arc<dyn NotificationSink>,
}

impl Router {
    #[must_use]
    pub fn new(registry: Arc<Registry>, presence: PresenceNotifier) -> Self {
        Self {
            registry,
            presence,
            sink: Arc::new(NoopSink),
        }
    }

    /// Replace the sink that receives every routed message
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sink currently receiving routed messages
    pub fn sink(&self) -> &Arc<dyn NotificationSink> {
        &self.sink
    }

    /// Decode and route one text frame from `sender_id`
    pub fn dispatch(&self, sender_id: &str, frame: &str) -> RouteOutcome {
        match InboundEnvelope::from_json(frame) {
            Ok(envelope) => self.route(sender_id, envelope),
            Err(e) => {
                tracing::warn!(connection_id = %sender_id, error = %e, "Dropping malformed frame");
                RouteOutcome::Malformed(e.to_string())
            }
        }
    }

    /// Route an already decoded envelope
    pub fn route(&self, sender_id: &str, envelope: InboundEnvelope) -> RouteOutcome {
        if envelope.event.carries_text() {
            if let Err(e) = envelope.require_text() {
                tracing::warn!(
                    connection_id = %sender_id,
                    event = %envelope.event,
                    error = %e,
                    "Dropping message without text"
                );
                return RouteOutcome::Malformed(e.to_string());
            }
        }

        match envelope.event {
            EventKind::Register => self.register(sender_id, envelope.name.as_deref()),
            EventKind::Message if envelope.to.is_some() => self.direct(sender_id, envelope),
            EventKind::Message | EventKind::GroupMessage => self.broadcast(sender_id, envelope),
            EventKind::Info | EventKind::Unknown(_) => {
                tracing::debug!(
                    connection_id = %sender_id,
                    event = %envelope.event,
                    "Ignoring event"
                );
                RouteOutcome::Ignored
            }
        }
    }

    fn register(&self, sender_id: &str, name: Option<&str>) -> RouteOutcome {
        let result = name
            .ok_or(RegistryError::InvalidName)
            .and_then(|name| self.registry.set_name(sender_id, name));

        match result {
            Ok(name) => {
                tracing::info!(connection_id = %sender_id, name = %name, "Client registered");
                self.presence.announce();
                RouteOutcome::Registered { name }
            }
            Err(e) => {
                tracing::warn!(connection_id = %sender_id, error = %e, "Registration rejected");
                RouteOutcome::RegistrationRejected(e)
            }
        }
    }

    fn direct(&self, sender_id: &str, envelope: InboundEnvelope) -> RouteOutcome {
        let sender = self.sender(sender_id);
        let from = sender.as_ref().map_or_else(|| sender_id.to_string(), |s| s.label());
        let target_id = envelope.to.clone().unwrap_or_default();

        let payload = chat_payload(Some(target_id.clone()), from, envelope);
        let outbound = ServerEnvelope::Message(payload.clone());

        let Some(target) = self.registry.resolve(&target_id) else {
            let echoed = sender.is_some_and(|s| s.send(outbound).is_ok());
            tracing::debug!(
                connection_id = %sender_id,
                target = %target_id,
                echoed,
                "Direct message target not found"
            );
            return RouteOutcome::TargetNotFound {
                target: target_id,
                echoed,
            };
        };

        // A message to yourself is delivered once.
        let mut recipients = vec![target.clone()];
        if let Some(sender) = sender.filter(|s| s.id() != target.id()) {
            recipients.push(sender);
        }

        let delivered = deliver_all(&recipients, &outbound);

        tracing::debug!(
            connection_id = %sender_id,
            target_id = %target.id(),
            recipients = delivered,
            "Direct message routed"
        );

        self.notify(RouteKind::Direct, payload, delivered);
        RouteOutcome::Delivered {
            recipients: delivered,
        }
    }

    fn broadcast(&self, sender_id: &str, envelope: InboundEnvelope) -> RouteOutcome {
        let from = self
            .sender(sender_id)
            .map_or_else(|| sender_id.to_string(), |s| s.label());
        let event = envelope.event.clone();

        let payload = chat_payload(None, from, envelope);
        let outbound = if event == EventKind::Message {
            ServerEnvelope::Message(payload.clone())
        } else {
            ServerEnvelope::GroupMessage(payload.clone())
        };

        let delivered = deliver_all(&self.registry.connections(), &outbound);

        tracing::debug!(
            connection_id = %sender_id,
            event = %event,
            recipients = delivered,
            "Broadcast routed"
        );

        self.notify(RouteKind::Broadcast, payload, delivered);
        RouteOutcome::Broadcast {
            recipients: delivered,
        }
    }

    /// Open connection of the sender, if it still exists
    fn sender(&self, sender_id: &str) -> Option<Arc<Connection>> {
        self.registry
            .find_by_id(sender_id)
            .filter(|conn| conn.is_open())
    }

    /// Hand a routed message to the sink without waiting on it
    fn notify(&self, kind: RouteKind, payload: ChatPayload, recipients: usize) {
        let sink = self.sink.clone();

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime available, skipping notification");
            return;
        };

        let message = RoutedMessage {
            kind,
            from: payload.from,
            to: payload.to,
            text: payload.text,
            file_name: payload.file_name,
            file_url: payload.file_url,
            recipients,
        };

        handle.spawn(async move {
            if let Err(e) = sink.notify(message).await {
                tracing::warn!(sink = sink.name(), error = %e, "Notification sink failed");
            }
        });
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("registry", &self.registry)
            .field("sink", &self.sink.name())
            .finish_non_exhaustive()
    }
}

fn chat_payload(to: Option<String>, from: String, envelope: InboundEnvelope) -> ChatPayload {
    ChatPayload {
        to,
        from,
        text: envelope.text.unwrap_or_default(),
        file_name: envelope.file_name,
        file_url: envelope.file_url,
    }
}
