//! Connection registry
//!
//! Authoritative map of live connections. Every mutation and every snapshot is
//! a single critical section on one `RwLock`, so a roster never observes half
//! of an add, remove or rename.

use super::Connection;
use crate::protocol::PresenceSnapshot;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Registry mutation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("connection id already registered: {0}")]
    DuplicateIdentity(String),

    #[error("unknown connection: {0}")]
    UnknownConnection(String),

    #[error("display name is empty")]
    InvalidName,

    #[error("display name already in use: {0}")]
    NameTaken(String),
}

struct Slot {
    /// Join sequence number
    seq: u64,
    connection: Arc<Connection>,
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<String, Slot>,
    next_seq: u64,
}

impl Inner {
    /// Live connections in join order
    fn open_in_join_order(&self) -> Vec<Arc<Connection>> {
        let mut slots: Vec<&Slot> = self
            .by_id
            .values()
            .filter(|slot| slot.connection.is_open())
            .collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| slot.connection.clone()).collect()
    }

    fn find_by_name(&self, name: &str) -> Option<&Arc<Connection>> {
        self.by_id
            .values()
            .map(|slot| &slot.connection)
            .find(|conn| conn.is_open() && conn.has_name(name))
    }
}

/// Live connections keyed by connection id
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Insert a connection under its own id
    pub fn add(&self, connection: Arc<Connection>) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        let id = connection.id().to_string();

        if inner.by_id.contains_key(&id) {
            return Err(RegistryError::DuplicateIdentity(id));
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.by_id.insert(id.clone(), Slot { seq, connection });

        tracing::debug!(connection_id = %id, "Connection added");
        Ok(())
    }

    /// Remove and close a connection. Removing an absent id is a no-op.
    pub fn remove(&self, id: &str) -> Option<Arc<Connection>> {
        let removed = self.inner.write().by_id.remove(id)?;
        removed.connection.close();

        tracing::debug!(connection_id = %id, "Connection removed");
        Some(removed.connection)
    }

    /// Set or replace a connection's display name.
    ///
    /// Returns the trimmed name that was stored.
    pub fn set_name(&self, id: &str, name: &str) -> Result<String, RegistryError> {
        let name = name.trim();
        let inner = self.inner.write();

        let connection = &inner
            .by_id
            .get(id)
            .ok_or_else(|| RegistryError::UnknownConnection(id.to_string()))?
            .connection;

        if name.is_empty() {
            return Err(RegistryError::InvalidName);
        }

        if let Some(holder) = inner.find_by_name(name) {
            if holder.id() != id {
                return Err(RegistryError::NameTaken(name.to_string()));
            }
        }

        connection.set_display_name(name.to_string());

        tracing::debug!(connection_id = %id, name = %name, "Display name set");
        Ok(name.to_string())
    }

    pub fn find_by_id(&self, id: &str) -> Option<Arc<Connection>> {
        self.inner
            .read()
            .by_id
            .get(id)
            .map(|slot| slot.connection.clone())
    }

    /// Open connection currently holding `name`
    pub fn find_by_name(&self, name: &str) -> Option<Arc<Connection>> {
        let name = name.trim();
        self.inner.read().find_by_name(name).cloned()
    }

    /// Look up a target by display name, then by connection id
    pub fn resolve(&self, identifier: &str) -> Option<Arc<Connection>> {
        let identifier = identifier.trim();
        let inner = self.inner.read();

        inner
            .find_by_name(identifier)
            .or_else(|| {
                inner
                    .by_id
                    .get(identifier)
                    .map(|slot| &slot.connection)
                    .filter(|conn| conn.is_open())
            })
            .cloned()
    }

    /// Point-in-time roster of open connections
    pub fn snapshot(&self) -> PresenceSnapshot {
        let clients = self
            .inner
            .read()
            .open_in_join_order()
            .iter()
            .map(|conn| conn.label())
            .collect();

        PresenceSnapshot::new(clients)
    }

    /// Point-in-time list of open connections, in join order
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.inner.read().open_in_join_order()
    }

    /// Number of registered entries, open or closing
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_id.is_empty()
    }

    /// Number of open connections
    pub fn open_count(&self) -> usize {
        self.inner
            .read()
            .by_id
            .values()
            .filter(|slot| slot.connection.is_open())
            .count()
    }

    /// Remove and close everything
    pub fn drain(&self) -> Vec<Arc<Connection>> {
        let drained: Vec<Arc<Connection>> = self
            .inner
            .write()
            .by_id
            .drain()
            .map(|(_, slot)| slot.connection)
            .collect();

        for conn in &drained {
            conn.close();
        }

        drained
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("connections", &self.len())
            .finish()
    }
}
