//! Relay wire protocol
//!
//! Every WebSocket text frame carries one JSON envelope tagged by `event`.

mod envelope;
mod events;
mod messages;

pub use envelope::{EnvelopeError, InboundEnvelope};
pub use events::EventKind;
pub use messages::{ChatPayload, PresenceSnapshot, ServerEnvelope};
