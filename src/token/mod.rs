pub mod claims;
pub mod error;
pub mod signer;

pub use error::Error;
pub use signer::{SigningSecret, TokenSigner};

use std::sync::Arc;

use crate::core::models::Session;
use crate::core::types::{Identity, IssuedToken, TokenKind, TokenPair};
use crate::db::CredentialStore;
use crate::util::clock::{Clock, SystemClock};
use crate::util::hash::digest_refresh_token;

use tracing::{event, Level};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid(Identity),
    Invalid,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Self::Valid(identity) => Some(identity),
            Self::Invalid => None,
        }
    }
}

/// Issues, verifies and rotates access and refresh tokens.
///
/// Access tokens are stateless. A refresh token is only valid while its
/// digest is present in the credential store.
pub struct TokenService {
    access: TokenSigner,
    refresh: TokenSigner,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenService {{ store: {:?}, .. }}", self.store)
    }
}

impl TokenService {
    pub fn new(
        access_secret: &SigningSecret,
        refresh_secret: &SigningSecret,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            access: TokenSigner::new(TokenKind::Access, access_secret),
            refresh: TokenSigner::new(TokenKind::Refresh, refresh_secret),
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn issue(&self, signer: &TokenSigner, identity: &Identity) -> Result<(IssuedToken, u64), Error> {
        let now = self.clock.now();
        let ttl = signer.kind().expires_in_secs();
        let token = signer.sign(identity, ttl, now)?;

        Ok((
            IssuedToken {
                token,
                expires_in_seconds: ttl,
            },
            now.saturating_add(ttl),
        ))
    }

    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub fn issue_access_token(&self, identity: &Identity) -> Result<IssuedToken, Error> {
        let (issued, _) = self.issue(&self.access, identity)?;
        event!(Level::DEBUG, "Issued access token");
        Ok(issued)
    }

    /// The token is only handed out once its digest has been stored.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn issue_refresh_token(&self, identity: &Identity) -> Result<IssuedToken, Error> {
        let (issued, invalid_after) = self.issue(&self.refresh, identity)?;
        self.store
            .insert(&digest_refresh_token(&issued.token), invalid_after)
            .await?;

        event!(Level::DEBUG, "Issued refresh token");
        Ok(issued)
    }

    pub async fn issue_token_pair(&self, identity: &Identity) -> Result<TokenPair, Error> {
        let refresh_token = self.issue_refresh_token(identity).await?;
        let access_token = self.issue_access_token(identity)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub fn verify_access_token(&self, token: &str) -> Verification {
        self.access.verify(token, self.clock.now())
    }

    /// Store errors are returned as errors, never as `Invalid`.
    pub async fn verify_refresh_token(&self, token: &str) -> Result<Verification, Error> {
        if token.is_empty() {
            return Ok(Verification::Invalid);
        }

        if !self.store.exists(&digest_refresh_token(token)).await? {
            event!(Level::DEBUG, "Refresh token is not live");
            return Ok(Verification::Invalid);
        }

        Ok(self.refresh.verify(token, self.clock.now()))
    }

    /// Removes a refresh token from the live set. Unknown tokens are ignored.
    pub async fn delete_refresh_token(&self, token: &str) -> Result<(), Error> {
        let removed = self.store.delete(&digest_refresh_token(token)).await?;
        event!(Level::DEBUG, removed, "Deleted refresh token");
        Ok(())
    }

    /// Exchanges a live refresh token for a new pair, consuming it.
    ///
    /// Returns `None` if the token is invalid or was consumed by a
    /// concurrent rotation.
    #[tracing::instrument(skip(self, token))]
    pub async fn rotate_refresh_token(&self, token: &str) -> Result<Option<Session>, Error> {
        let identity = match self.verify_refresh_token(token).await? {
            Verification::Valid(identity) => identity,
            Verification::Invalid => return Ok(None),
        };

        if !self.store.delete(&digest_refresh_token(token)).await? {
            event!(Level::INFO, user_id = %identity.id, "Refresh token was already consumed");
            return Ok(None);
        }

        let tokens = self.issue_token_pair(&identity).await?;
        event!(Level::INFO, user_id = %identity.id, "Rotated refresh token");
        Ok(Some(Session { identity, tokens }))
    }

    pub async fn purge_expired(&self) -> Result<usize, Error> {
        let removed = self.store.purge_expired(self.clock.now()).await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::HashedRefreshToken;
    use crate::db::{MemoryStore, StoreError};
    use crate::util::clock::ManualClock;

    const START: u64 = 1_600_000_000;

    fn secrets() -> (SigningSecret, SigningSecret) {
        (
            SigningSecret::new("access-secret").unwrap(),
            SigningSecret::new("refresh-secret").unwrap(),
        )
    }

    fn service() -> (TokenService, Arc<MemoryStore>, Arc<ManualClock>) {
        let (access, refresh) = secrets();
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::starting_at(START));
        let service = TokenService::new(&access, &refresh, store.clone()).with_clock(clock.clone());
        (service, store, clock)
    }

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait::async_trait]
    impl CredentialStore for FailingStore {
        async fn exists(&self, _: &HashedRefreshToken) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn insert(&self, _: &HashedRefreshToken, _: u64) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn delete(&self, _: &HashedRefreshToken) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn purge_expired(&self, _: u64) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn issue_expire_and_rotate() {
        let (service, store, clock) = service();
        let identity = Identity::new("u1");

        let pair = service.issue_token_pair(&identity).await.unwrap();
        assert_eq!(pair.access_token.expires_in_seconds, 900);
        assert_eq!(pair.refresh_token.expires_in_seconds, 7_776_000);
        assert_eq!(store.len().await, 1);
        assert_eq!(
            service.verify_access_token(&pair.access_token.token),
            Verification::Valid(identity.clone())
        );

        clock.advance(15 * 60 + 1);
        assert_eq!(
            service.verify_access_token(&pair.access_token.token),
            Verification::Invalid
        );
        assert!(service
            .verify_refresh_token(&pair.refresh_token.token)
            .await
            .unwrap()
            .is_valid());

        let session = service
            .rotate_refresh_token(&pair.refresh_token.token)
            .await
            .unwrap()
            .expect("rotation succeeds");
        assert_eq!(session.identity, identity);
        assert_ne!(session.tokens.refresh_token.token, pair.refresh_token.token);
        assert_eq!(store.len().await, 1);

        assert_eq!(
            service.verify_refresh_token(&pair.refresh_token.token).await.unwrap(),
            Verification::Invalid
        );
        assert!(service
            .verify_refresh_token(&session.tokens.refresh_token.token)
            .await
            .unwrap()
            .is_valid());
        assert!(service
            .verify_access_token(&session.tokens.access_token.token)
            .is_valid());
    }

    #[tokio::test]
    async fn garbage_is_invalid_everywhere() {
        let (service, _, _) = service();

        for token in &["", "garbage", "a.b.c"] {
            assert_eq!(service.verify_access_token(token), Verification::Invalid);
            assert_eq!(
                service.verify_refresh_token(token).await.unwrap(),
                Verification::Invalid
            );
            assert!(service.rotate_refresh_token(token).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn signed_but_unstored_refresh_tokens_are_invalid() {
        let (service, _, _) = service();
        let token = service
            .refresh
            .sign(&Identity::new("u1"), 3600, START)
            .unwrap();

        assert_eq!(
            service.verify_refresh_token(&token).await.unwrap(),
            Verification::Invalid
        );
    }

    #[tokio::test]
    async fn access_and_refresh_secrets_are_not_interchangeable() {
        let (service, _, _) = service();
        let pair = service.issue_token_pair(&Identity::new("u1")).await.unwrap();

        assert_eq!(
            service.verify_access_token(&pair.refresh_token.token),
            Verification::Invalid
        );
    }

    #[tokio::test]
    async fn deleted_refresh_tokens_stay_deleted() {
        let (service, store, _) = service();
        let pair = service.issue_token_pair(&Identity::new("u1")).await.unwrap();

        service.delete_refresh_token(&pair.refresh_token.token).await.unwrap();
        service.delete_refresh_token(&pair.refresh_token.token).await.unwrap();

        assert!(store.is_empty().await);
        assert_eq!(
            service.verify_refresh_token(&pair.refresh_token.token).await.unwrap(),
            Verification::Invalid
        );
    }

    #[tokio::test]
    async fn concurrent_rotations_have_one_winner() {
        let (service, _, _) = service();
        let pair = service.issue_token_pair(&Identity::new("u1")).await.unwrap();
        let token = pair.refresh_token.token.as_str();

        let (a, b) = tokio::join!(
            service.rotate_refresh_token(token),
            service.rotate_refresh_token(token)
        );

        let winners = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|s| s.is_some())
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn purge_removes_expired_refresh_tokens() {
        let (service, store, clock) = service();
        service.issue_token_pair(&Identity::new("u1")).await.unwrap();

        assert_eq!(service.purge_expired().await.unwrap(), 0);
        clock.advance(TokenKind::Refresh.expires_in_secs());
        assert_eq!(service.purge_expired().await.unwrap(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn store_failures_are_errors_not_invalid_tokens() {
        let (access, refresh) = secrets();
        let service = TokenService::new(&access, &refresh, Arc::new(FailingStore));

        assert!(matches!(
            service.issue_token_pair(&Identity::new("u1")).await,
            Err(Error::Store(_))
        ));
        assert!(matches!(
            service.verify_refresh_token("anything").await,
            Err(Error::Store(_))
        ));
        assert!(matches!(
            service.rotate_refresh_token("anything").await,
            Err(Error::Store(_))
        ));
    }
}
