//! Connection management
//!
//! Live connections, their outbound queues, and the registry that owns them.

mod connection;
mod registry;

pub use connection::{deliver_all, Connection, ConnectionState, SendError};
pub use registry::{Registry, RegistryError};
