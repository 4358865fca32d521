use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{event, Level};

use super::error::FederationError;
use super::models::JwkSet;

/// Where a provider publishes its signing keys.
#[async_trait]
pub trait KeyFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch_keys(&self) -> Result<JwkSet, FederationError>;
}

#[derive(Debug, Clone)]
pub struct RemoteKeys {
    http: reqwest::Client,
    jwks_uri: String,
}

impl RemoteKeys {
    pub fn new(http: reqwest::Client, jwks_uri: impl Into<String>) -> Self {
        Self {
            http,
            jwks_uri: jwks_uri.into(),
        }
    }
}

#[async_trait]
impl KeyFetcher for RemoteKeys {
    async fn fetch_keys(&self) -> Result<JwkSet, FederationError> {
        let failed = |e: reqwest::Error| FederationError::Discovery(e.to_string());

        self.http
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(failed)?
            .error_for_status()
            .map_err(failed)?
            .json::<JwkSet>()
            .await
            .map_err(failed)
    }
}

/// A provider's RSA keys, refetched when a token names a key we have not seen.
///
/// Providers rotate keys without notice, so a `kid` miss triggers exactly one
/// refetch before the token is refused.
#[derive(Debug)]
pub struct SigningKeys {
    current: RwLock<JwkSet>,
    source: Arc<dyn KeyFetcher>,
}

impl SigningKeys {
    pub fn new(initial: JwkSet, source: Arc<dyn KeyFetcher>) -> Self {
        Self {
            current: RwLock::new(initial),
            source,
        }
    }

    fn lookup(keys: &JwkSet, kid: Option<&str>) -> Option<(String, String)> {
        keys.find_rsa(kid)
            .map(|(n, e)| (n.to_string(), e.to_string()))
    }

    /// RSA modulus and exponent for `kid`.
    pub async fn find(&self, kid: Option<&str>) -> Result<(String, String), FederationError> {
        if let Some(found) = Self::lookup(&*self.current.read().await, kid) {
            return Ok(found);
        }

        event!(Level::INFO, kid = kid.unwrap_or("none"), "Unknown signing key, refetching key set");
        let fresh = self.source.fetch_keys().await?;
        let found = Self::lookup(&fresh, kid);
        *self.current.write().await = fresh;

        found.ok_or_else(|| FederationError::Exchange("no matching signing key".into()))
    }
}
