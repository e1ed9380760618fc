//! Repository traits

use super::RepoResult;
use crate::models::UserModel;
use async_trait::async_trait;

/// Storage for relay user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create the backing table if it does not exist
    async fn ensure_schema(&self) -> RepoResult<()>;

    /// Insert a user. Fails with `UsernameTaken` on a duplicate username.
    async fn create(&self, username: &str, password_hash: &str) -> RepoResult<UserModel>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<UserModel>>;
}
