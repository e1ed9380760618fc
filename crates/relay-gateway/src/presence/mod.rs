//! Presence announcements

mod notifier;

pub use notifier::PresenceNotifier;
