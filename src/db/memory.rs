use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::auth::users::{DirectoryError, UserDirectory};
use crate::core::models::{ProviderLink, User};
use crate::core::types::{HashedRefreshToken, Password, Provider, UserId};
use crate::util::hash::HashingService;
use crate::util::random::FromRandom;

use super::{CredentialStore, StoreError};

/// Refresh token store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tokens: Mutex<HashMap<HashedRefreshToken, u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryStore {
    async fn exists(&self, token: &HashedRefreshToken) -> Result<bool, StoreError> {
        Ok(self.tokens.lock().await.contains_key(token))
    }

    async fn insert(&self, token: &HashedRefreshToken, invalid_after: u64) -> Result<(), StoreError> {
        let mut tokens = self.tokens.lock().await;
        if tokens.contains_key(token) {
            return Err(StoreError::AlreadyExists);
        }
        tokens.insert(token.clone(), invalid_after);
        Ok(())
    }

    async fn delete(&self, token: &HashedRefreshToken) -> Result<bool, StoreError> {
        Ok(self.tokens.lock().await.remove(token).is_some())
    }

    async fn purge_expired(&self, now: u64) -> Result<usize, StoreError> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, invalid_after| *invalid_after > now);
        Ok(before - tokens.len())
    }
}

#[derive(Debug, Default)]
struct Directory {
    users: HashMap<String, User>,
    links: Vec<ProviderLink>,
}

/// User directory kept in process memory.
#[derive(Debug)]
pub struct MemoryUserDirectory {
    hasher: HashingService,
    inner: Mutex<Directory>,
}

impl MemoryUserDirectory {
    pub fn new(hasher: HashingService) -> Self {
        Self {
            hasher,
            inner: Mutex::new(Directory::default()),
        }
    }

    pub async fn links(&self) -> Vec<ProviderLink> {
        self.inner.lock().await.links.clone()
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn get_or_create_by_provider(
        &self,
        provider: Provider,
        provider_user_id: &str,
        email: &str,
    ) -> Result<UserId, DirectoryError> {
        let mut inner = self.inner.lock().await;

        let existing = inner
            .links
            .iter()
            .find(|l| l.provider == provider && l.provider_user_id == provider_user_id);
        if let Some(link) = existing {
            return Ok(link.user_id.clone());
        }

        if inner.users.contains_key(email) {
            return Err(DirectoryError::UsernameTaken);
        }

        let user = User {
            id: UserId::from_random(),
            username: email.to_string(),
            password: None,
        };
        let id = user.id.clone();
        inner.users.insert(email.to_string(), user);
        inner.links.push(ProviderLink {
            provider,
            provider_user_id: provider_user_id.to_string(),
            user_id: id.clone(),
        });
        Ok(id)
    }

    async fn verify_password(
        &self,
        username: &str,
        password: &Password,
    ) -> Result<Option<UserId>, DirectoryError> {
        let user = match self.inner.lock().await.users.get(username) {
            Some(user) => user.clone(),
            None => return Ok(None),
        };

        let hashed = user.password.ok_or(DirectoryError::ThirdPartyAccount)?;
        if self.hasher.verify(password, &hashed)? {
            Ok(Some(user.id))
        } else {
            Ok(None)
        }
    }

    async fn create_user(&self, username: &str, password: &Password) -> Result<UserId, DirectoryError> {
        let hashed = self.hasher.hash(password)?;
        let mut inner = self.inner.lock().await;
        if inner.users.contains_key(username) {
            return Err(DirectoryError::UsernameTaken);
        }

        let user = User {
            id: UserId::from_random(),
            username: username.to_string(),
            password: Some(hashed),
        };
        let id = user.id.clone();
        inner.users.insert(username.to_string(), user);
        Ok(id)
    }
}
