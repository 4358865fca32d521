use crate::core::types::{Password, Provider, UserId};
use crate::db::StoreError;
use crate::util::hash::HashError;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error("account was created through a third party provider")]
    ThirdPartyAccount,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Hashing(#[from] HashError),
}

/// User lookups this core needs but does not own.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug {
    async fn get_or_create_by_provider(
        &self,
        provider: Provider,
        provider_user_id: &str,
        email: &str,
    ) -> Result<UserId, DirectoryError>;

    /// `Ok(None)` for an unknown user or a wrong password.
    async fn verify_password(
        &self,
        username: &str,
        password: &Password,
    ) -> Result<Option<UserId>, DirectoryError>;

    /// Registers a password account. Fails with
    /// [`DirectoryError::UsernameTaken`] when the username is in use.
    async fn create_user(&self, username: &str, password: &Password) -> Result<UserId, DirectoryError>;
}
