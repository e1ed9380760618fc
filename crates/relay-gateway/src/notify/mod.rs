//! Post-routing notifications
//!
//! After a message is routed the router hands a [`RoutedMessage`] to a
//! [`NotificationSink`] on a spawned task. Sink failures never reach clients.

mod sink;
mod webhook;

pub use sink::{NoopSink, NotificationSink, NotifyError, RouteKind, RoutedMessage};
pub use webhook::WebhookSink;
