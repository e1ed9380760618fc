//! # relay-db
//!
//! User store backing the relay's signup and login endpoints.
//!
//! ## Overview
//!
//! - Connection pool management
//! - The `users` table model with a SQLx `FromRow` derive
//! - The [`UserRepository`] trait with a PostgreSQL and an in-memory
//!   implementation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_db::{create_pool, DatabaseConfig, PgUserRepository, UserRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::default()).await?;
//!     let users = PgUserRepository::new(pool);
//!     users.ensure_schema().await?;
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod pool;
pub mod repositories;

pub use models::UserModel;
pub use pool::{create_pool, DatabaseConfig, PgPool};
pub use repositories::{
    MemoryUserRepository, PgUserRepository, RepoResult, RepositoryError, UserRepository,
};
