pub mod client;
pub mod error;
pub mod keys;
pub mod models;
pub mod registry;
pub mod types;

pub use error::FederationError;
pub use registry::ClientRegistry;

use std::sync::Arc;

use tracing::{event, Level};
use url::Url;

use crate::auth::users::UserDirectory;
use crate::core::types::{Identity, Provider, TokenPair, UserId};
use crate::token::TokenService;
use crate::util::params::append_params;
use crate::util::random::FromRandom;
use models::CallbackParams;
use types::Nonce;

#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub location: Url,
    pub nonce: Nonce,
}

#[derive(Debug, Clone)]
pub struct FederatedLogin {
    pub user_id: UserId,
    pub tokens: TokenPair,
    /// Set when the provider is registered with a frontend target.
    pub redirect: Option<Url>,
}

/// Runs third party logins from the first redirect to the issued token pair.
#[derive(Debug)]
pub struct FederationCoordinator {
    registry: ClientRegistry,
    tokens: Arc<TokenService>,
    users: Arc<dyn UserDirectory>,
}

impl FederationCoordinator {
    pub fn new(
        registry: ClientRegistry,
        tokens: Arc<TokenService>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            registry,
            tokens,
            users,
        }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    #[tracing::instrument(skip(self))]
    pub async fn initiate(&self, provider: &str) -> Result<LoginRedirect, FederationError> {
        let provider: Provider = provider.parse()?;
        let client = self.registry.get_or_init(provider).await?;

        let nonce = Nonce::from_random();
        let location = client.authorization_url(&nonce)?;

        event!(Level::DEBUG, %provider, "Redirecting to identity provider");
        Ok(LoginRedirect { location, nonce })
    }

    /// `nonce` is the value from the client's nonce cookie.
    #[tracing::instrument(skip(self, nonce, params))]
    pub async fn callback(
        &self,
        provider: &str,
        nonce: Option<Nonce>,
        params: CallbackParams,
    ) -> Result<FederatedLogin, FederationError> {
        let provider: Provider = provider.parse()?;
        if self.registry.registration(provider).is_none() {
            return Err(FederationError::UnsupportedProvider(provider.to_string()));
        }
        let nonce = nonce
            .filter(|n| !n.0.is_empty())
            .ok_or(FederationError::MissingNonce)?;
        let client = self
            .registry
            .get(provider)
            .ok_or(FederationError::ClientNotInitialized(provider))?;

        if params.state.as_deref() != Some(nonce.as_str()) {
            event!(Level::WARN, %provider, "Callback state does not match nonce");
            return Err(FederationError::NonceMismatch);
        }

        let claims = client.exchange(&params, &nonce).await?;
        let email = claims
            .email
            .filter(|e| !e.is_empty())
            .ok_or(FederationError::MissingEmail)?;

        let user_id = self
            .users
            .get_or_create_by_provider(provider, &claims.subject, &email)
            .await?;
        let tokens = self
            .tokens
            .issue_token_pair(&Identity::from(user_id.clone()))
            .await?;

        let redirect = match self.registry.registration(provider).and_then(|r| r.redirect_to.clone()) {
            Some(target) => Some(append_params(target, &[("userid", user_id.0.as_str())])?),
            None => None,
        };

        event!(Level::INFO, %provider, user_id = %user_id, "Federated login succeeded");
        Ok(FederatedLogin {
            user_id,
            tokens,
            redirect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::db::{MemoryStore, MemoryUserDirectory};
    use crate::oidc::client::{ClientFactory, FederatedClient};
    use crate::oidc::models::{ProviderClaims, Registration};
    use crate::oidc::types::ResponseMode;
    use crate::token::{SigningSecret, Verification};
    use crate::util::hash::HashingService;
    use crate::util::params::append_params;

    #[derive(Debug)]
    struct FakeClient {
        email: Option<String>,
        exchanges: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl FederatedClient for FakeClient {
        fn authorization_url(&self, nonce: &Nonce) -> Result<Url, FederationError> {
            let url = Url::parse("https://idp.example.com/auth").unwrap();
            Ok(append_params(url, &[("nonce", nonce.as_str()), ("state", nonce.as_str())])?)
        }

        async fn exchange(
            &self,
            _: &CallbackParams,
            _: &Nonce,
        ) -> Result<ProviderClaims, FederationError> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            Ok(ProviderClaims {
                subject: "sub-1".into(),
                email: self.email.clone(),
            })
        }
    }

    #[derive(Debug)]
    struct FakeFactory(Arc<FakeClient>);

    #[async_trait::async_trait]
    impl ClientFactory for FakeFactory {
        async fn discover(
            &self,
            _: &Registration,
        ) -> Result<Arc<dyn FederatedClient>, FederationError> {
            Ok(self.0.clone())
        }
    }

    fn registration(provider: Provider, redirect_to: Option<&str>) -> Registration {
        Registration {
            provider,
            discovery_url: Url::parse("https://idp.example.com").unwrap(),
            client_id: "id".into(),
            client_secret: None,
            callback: Url::parse("https://api.example.com/cb").unwrap(),
            scope: "openid email".into(),
            response_mode: ResponseMode::Query,
            redirect_to: redirect_to.map(|u| Url::parse(u).unwrap()),
        }
    }

    struct Fixture {
        coordinator: FederationCoordinator,
        client: Arc<FakeClient>,
        tokens: Arc<TokenService>,
    }

    fn fixture(email: Option<&str>) -> Fixture {
        let client = Arc::new(FakeClient {
            email: email.map(str::to_string),
            exchanges: AtomicUsize::new(0),
        });
        let registry = ClientRegistry::new(
            vec![
                registration(Provider::Google, Some("https://blog.example.com/signin/google")),
                registration(Provider::Facebook, None),
            ],
            Arc::new(FakeFactory(client.clone())),
        );
        let tokens = Arc::new(TokenService::new(
            &SigningSecret::new("access").unwrap(),
            &SigningSecret::new("refresh").unwrap(),
            Arc::new(MemoryStore::new()),
        ));
        let users = Arc::new(MemoryUserDirectory::new(HashingService::with_secret_key(
            "pepper".into(),
        )));

        Fixture {
            coordinator: FederationCoordinator::new(registry, tokens.clone(), users),
            client,
            tokens,
        }
    }

    fn params(state: &str) -> CallbackParams {
        CallbackParams {
            code: Some("code".into()),
            state: Some(state.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn initiate_embeds_the_issued_nonce() {
        let f = fixture(Some("a@example.com"));
        let redirect = f.coordinator.initiate("google").await.unwrap();

        let nonce = redirect
            .location
            .query_pairs()
            .find(|(k, _)| k == "nonce")
            .map(|(_, v)| v.into_owned());
        assert_eq!(nonce.as_deref(), Some(redirect.nonce.as_str()));
    }

    #[tokio::test]
    async fn unknown_providers_are_rejected() {
        let f = fixture(Some("a@example.com"));
        assert!(matches!(
            f.coordinator.initiate("myspace").await,
            Err(FederationError::UnsupportedProvider(_))
        ));
        assert!(matches!(
            f.coordinator
                .callback("myspace", Some(Nonce("n".into())), params("n"))
                .await,
            Err(FederationError::UnsupportedProvider(_))
        ));
    }

    #[tokio::test]
    async fn unregistered_providers_are_unsupported_on_both_legs() {
        let f = fixture(Some("a@example.com"));
        let registry = ClientRegistry::new(
            vec![registration(Provider::Google, None)],
            Arc::new(FakeFactory(f.client.clone())),
        );
        let users = Arc::new(MemoryUserDirectory::new(HashingService::with_secret_key(
            "pepper".into(),
        )));
        let coordinator = FederationCoordinator::new(registry, f.tokens.clone(), users);

        assert!(matches!(
            coordinator.initiate("facebook").await,
            Err(FederationError::UnsupportedProvider(_))
        ));
        assert!(matches!(
            coordinator
                .callback("facebook", Some(Nonce("n".into())), params("n"))
                .await,
            Err(FederationError::UnsupportedProvider(_))
        ));
    }

    #[tokio::test]
    async fn callback_requires_a_nonce() {
        let f = fixture(Some("a@example.com"));
        f.coordinator.initiate("google").await.unwrap();

        assert!(matches!(
            f.coordinator.callback("google", None, params("n")).await,
            Err(FederationError::MissingNonce)
        ));
    }

    #[tokio::test]
    async fn callback_never_builds_the_client() {
        let f = fixture(Some("a@example.com"));

        assert!(matches!(
            f.coordinator
                .callback("google", Some(Nonce("n".into())), params("n"))
                .await,
            Err(FederationError::ClientNotInitialized(Provider::Google))
        ));
        assert!(f.coordinator.registry().get(Provider::Google).is_none());
    }

    #[tokio::test]
    async fn mismatched_nonce_is_rejected_before_exchange() {
        let f = fixture(Some("a@example.com"));
        let redirect = f.coordinator.initiate("google").await.unwrap();

        let result = f
            .coordinator
            .callback("google", Some(redirect.nonce), params("forged"))
            .await;

        assert!(matches!(result, Err(FederationError::NonceMismatch)));
        assert_eq!(f.client.exchanges.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_email_is_rejected() {
        let f = fixture(None);
        let redirect = f.coordinator.initiate("facebook").await.unwrap();
        let state = redirect.nonce.0.clone();

        assert!(matches!(
            f.coordinator
                .callback("facebook", Some(redirect.nonce), params(&state))
                .await,
            Err(FederationError::MissingEmail)
        ));
    }

    #[tokio::test]
    async fn successful_callback_issues_a_pair() {
        let f = fixture(Some("a@example.com"));
        let redirect = f.coordinator.initiate("google").await.unwrap();
        let state = redirect.nonce.0.clone();

        let login = f
            .coordinator
            .callback("google", Some(redirect.nonce), params(&state))
            .await
            .unwrap();

        assert_eq!(
            f.tokens.verify_access_token(&login.tokens.access_token.token),
            Verification::Valid(Identity::from(login.user_id.clone()))
        );
        let target = login.redirect.unwrap();
        assert_eq!(target.path(), "/signin/google");
        assert_eq!(
            target.query_pairs().find(|(k, _)| k == "userid").map(|(_, v)| v.into_owned()),
            Some(login.user_id.0.clone())
        );
    }

    #[tokio::test]
    async fn providers_without_a_target_deliver_json() {
        let f = fixture(Some("a@example.com"));
        let redirect = f.coordinator.initiate("facebook").await.unwrap();
        let state = redirect.nonce.0.clone();

        let login = f
            .coordinator
            .callback("facebook", Some(redirect.nonce), params(&state))
            .await
            .unwrap();
        assert!(login.redirect.is_none());
    }
}
