//! In-memory UserRepository
//!
//! Used when exercising the auth endpoints without PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{RepoResult, RepositoryError, UserRepository};
use crate::models::UserModel;

#[derive(Debug, Default)]
struct Store {
    users: HashMap<String, UserModel>,
    next_id: i64,
}

/// Process-local user store
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    store: Mutex<Store>,
}

impl MemoryUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.lock().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn ensure_schema(&self) -> RepoResult<()> {
        Ok(())
    }

    async fn create(&self, username: &str, password_hash: &str) -> RepoResult<UserModel> {
        let mut store = self.store.lock();

        if store.users.contains_key(username) {
            return Err(RepositoryError::UsernameTaken(username.to_string()));
        }

        store.next_id += 1;
        let user = UserModel {
            id: store.next_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        store.users.insert(username.to_string(), user.clone());

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<UserModel>> {
        Ok(self.store.lock().users.get(username).cloned())
    }
}
