//! Repository implementations
//!
//! The [`UserRepository`] trait and its PostgreSQL and in-memory backends.

mod error;
mod memory;
mod traits;
mod user;

pub use error::{RepoResult, RepositoryError};
pub use memory::MemoryUserRepository;
pub use traits::UserRepository;
pub use user::PgUserRepository;
