#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;
use warp::http::header::SET_COOKIE;
use warp::http::Response;
use warp::hyper::body::Bytes;

use scribe_auth::auth::users::UserDirectory;
use scribe_auth::core::types::{Password, Provider, UserId};
use scribe_auth::db::{MemoryStore, MemoryUserDirectory};
use scribe_auth::http::server::AuthContext;
use scribe_auth::oidc::client::{ClientFactory, FederatedClient};
use scribe_auth::oidc::models::{CallbackParams, ProviderClaims, Registration};
use scribe_auth::oidc::types::{Nonce, ResponseMode};
use scribe_auth::oidc::{ClientRegistry, FederationCoordinator, FederationError};
use scribe_auth::token::{SigningSecret, TokenService};
use scribe_auth::util::hash::HashingService;
use scribe_auth::util::params::append_params;

pub const PASSWORD_USER: &str = "carol@example.com";
pub const PASSWORD: &str = "correct horse";

/// Identity provider that accepts any code and vouches for one user.
#[derive(Debug)]
pub struct FakeProvider {
    pub subject: String,
    pub email: Option<String>,
}

#[async_trait]
impl FederatedClient for FakeProvider {
    fn authorization_url(&self, nonce: &Nonce) -> Result<Url, FederationError> {
        let url = Url::parse("https://idp.example.com/authorize").unwrap();
        Ok(append_params(
            url,
            &[("nonce", nonce.as_str()), ("state", nonce.as_str())],
        )?)
    }

    async fn exchange(
        &self,
        _: &CallbackParams,
        _: &Nonce,
    ) -> Result<ProviderClaims, FederationError> {
        Ok(ProviderClaims {
            subject: self.subject.clone(),
            email: self.email.clone(),
        })
    }
}

#[derive(Debug)]
pub struct FakeDiscovery {
    pub email: Option<String>,
}

#[async_trait]
impl ClientFactory for FakeDiscovery {
    async fn discover(
        &self,
        registration: &Registration,
    ) -> Result<Arc<dyn FederatedClient>, FederationError> {
        Ok(Arc::new(FakeProvider {
            subject: format!("{}-subject", registration.provider),
            email: self.email.clone(),
        }))
    }
}

fn registration(provider: Provider) -> Registration {
    let (response_mode, redirect_to) = match provider {
        Provider::Google => (
            ResponseMode::FormPost,
            Some(Url::parse("https://blog.example.com/signin/google").unwrap()),
        ),
        Provider::Facebook => (ResponseMode::Query, None),
    };

    Registration {
        provider,
        discovery_url: Url::parse("https://idp.example.com").unwrap(),
        client_id: format!("{}-client", provider),
        client_secret: None,
        callback: Url::parse(&format!(
            "https://api.example.com/auth/login/{}/callback",
            provider
        ))
        .unwrap(),
        scope: "openid email".into(),
        response_mode,
        redirect_to,
    }
}

pub struct TestApp {
    pub context: Arc<AuthContext>,
    pub tokens: Arc<TokenService>,
    pub store: Arc<MemoryStore>,
    pub password_user: UserId,
}

pub async fn app_with_email(email: Option<&str>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let tokens = Arc::new(TokenService::new(
        &SigningSecret::new("access-secret").unwrap(),
        &SigningSecret::new("refresh-secret").unwrap(),
        store.clone(),
    ));

    let users = Arc::new(MemoryUserDirectory::new(HashingService::with_secret_key(
        "pepper".into(),
    )));
    let password_user = users
        .create_user(PASSWORD_USER, &Password(PASSWORD.into()))
        .await
        .unwrap();

    let registry = ClientRegistry::new(
        Provider::ALL.iter().copied().map(registration).collect(),
        Arc::new(FakeDiscovery {
            email: email.map(str::to_string),
        }),
    );
    let federation = FederationCoordinator::new(registry, tokens.clone(), users.clone());

    let context = Arc::new(AuthContext {
        tokens: tokens.clone(),
        users,
        federation,
    });

    TestApp {
        context,
        tokens,
        store,
        password_user,
    }
}

pub async fn app() -> TestApp {
    app_with_email(Some("dana@example.com")).await
}

pub fn set_cookies(response: &Response<Bytes>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The value of the cookie called `name` among the `Set-Cookie` headers.
pub fn cookie_value(response: &Response<Bytes>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    set_cookies(response).into_iter().find_map(|c| {
        c.split(';')
            .next()
            .and_then(|pair| pair.strip_prefix(&prefix))
            .map(str::to_string)
    })
}

pub fn json(response: &Response<Bytes>) -> serde_json::Value {
    serde_json::from_slice(response.body()).unwrap()
}
