pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;

use crate::core::types::HashedRefreshToken;

pub use memory::{MemoryStore, MemoryUserDirectory};
pub use postgres::DbStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("refresh token is already registered")]
    AlreadyExists,
    #[error("database pool unavailable: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("failed to run migrations: {0}")]
    Migration(#[from] diesel_migrations::RunMigrationsError),
    #[error("{0}")]
    Unavailable(String),
}

/// Durable record of which refresh tokens are currently live.
///
/// Every call hits the backing store; nothing here may be cached, because
/// rotation relies on the store being the single source of truth.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    async fn exists(&self, token: &HashedRefreshToken) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::AlreadyExists`] when the token is already live.
    async fn insert(&self, token: &HashedRefreshToken, invalid_after: u64) -> Result<(), StoreError>;

    /// Idempotent. Returns whether a row was actually removed.
    async fn delete(&self, token: &HashedRefreshToken) -> Result<bool, StoreError>;

    async fn purge_expired(&self, now: u64) -> Result<usize, StoreError>;
}
