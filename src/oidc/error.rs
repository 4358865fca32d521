use crate::auth::users::DirectoryError;
use crate::core::types::{Provider, UnsupportedProvider};
use crate::token;

#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    #[error("Invalid auth service!")]
    UnsupportedProvider(String),
    #[error("Missing nonce!")]
    MissingNonce,
    #[error("Client has not been initialized")]
    ClientNotInitialized(Provider),
    #[error("Nonce does not match")]
    NonceMismatch,
    #[error("Third party did not provide email!")]
    MissingEmail,
    #[error("invalid callback: {0}")]
    InvalidCallback(String),
    #[error("provider discovery failed: {0}")]
    Discovery(String),
    #[error("code exchange failed: {0}")]
    Exchange(String),
    #[error("failed to encode parameters: {0}")]
    Encoding(#[from] serde_urlencoded::ser::Error),
    #[error(transparent)]
    Token(#[from] token::Error),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<UnsupportedProvider> for FederationError {
    fn from(e: UnsupportedProvider) -> Self {
        Self::UnsupportedProvider(e.0)
    }
}
