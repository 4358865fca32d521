use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::{event, Level};
use url::Url;

use super::error::FederationError;
use super::keys::{KeyFetcher, RemoteKeys, SigningKeys};
use super::models::{
    CallbackParams, IdTokenClaims, ProviderClaims, ProviderMetadata, Registration,
    TokenEndpointResponse,
};
use super::types::Nonce;
use crate::util::params::append_params;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const ID_TOKEN_LEEWAY_SECS: u64 = 60;

/// A discovered identity provider.
#[async_trait]
pub trait FederatedClient: Send + Sync + std::fmt::Debug {
    fn authorization_url(&self, nonce: &Nonce) -> Result<Url, FederationError>;

    /// Trades the callback parameters for the provider's claims about the user.
    /// The ID token must carry `nonce`.
    async fn exchange(
        &self,
        params: &CallbackParams,
        nonce: &Nonce,
    ) -> Result<ProviderClaims, FederationError>;
}

#[async_trait]
pub trait ClientFactory: Send + Sync + std::fmt::Debug {
    async fn discover(
        &self,
        registration: &Registration,
    ) -> Result<Arc<dyn FederatedClient>, FederationError>;
}

pub fn well_known_url(discovery_url: &Url) -> Url {
    if discovery_url
        .path()
        .trim_end_matches('/')
        .ends_with("/.well-known/openid-configuration")
    {
        return discovery_url.clone();
    }

    let mut url = discovery_url.clone();
    let path = format!(
        "{}/.well-known/openid-configuration",
        url.path().trim_end_matches('/')
    );
    url.set_path(&path);
    url
}

#[derive(Debug, Clone)]
pub struct Discovery {
    http: reqwest::Client,
}

impl Discovery {
    pub fn new() -> Result<Self, FederationError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FederationError::Discovery(e.to_string()))?;
        Ok(Self { http })
    }

    async fn metadata(&self, registration: &Registration) -> Result<ProviderMetadata, FederationError> {
        let discovery = |e: reqwest::Error| FederationError::Discovery(e.to_string());

        self.http
            .get(well_known_url(&registration.discovery_url))
            .send()
            .await
            .map_err(discovery)?
            .error_for_status()
            .map_err(discovery)?
            .json()
            .await
            .map_err(discovery)
    }
}

#[async_trait]
impl ClientFactory for Discovery {
    #[tracing::instrument(skip(self, registration), fields(provider = %registration.provider))]
    async fn discover(
        &self,
        registration: &Registration,
    ) -> Result<Arc<dyn FederatedClient>, FederationError> {
        let metadata = self.metadata(registration).await?;
        let source = Arc::new(RemoteKeys::new(self.http.clone(), metadata.jwks_uri.clone()));
        let keys = SigningKeys::new(source.fetch_keys().await?, source);

        let client = OidcClient::new(registration.clone(), metadata, keys, self.http.clone())?;
        event!(Level::INFO, "Discovered identity provider");
        Ok(Arc::new(client))
    }
}

#[derive(serde::Serialize)]
struct AuthorizationParams<'a> {
    client_id: &'a str,
    response_type: &'static str,
    redirect_uri: &'a str,
    scope: &'a str,
    response_mode: &'static str,
    nonce: &'a str,
    state: &'a str,
}

pub struct OidcClient {
    registration: Registration,
    issuer: String,
    authorization_endpoint: Url,
    token_endpoint: Url,
    keys: SigningKeys,
    http: reqwest::Client,
}

impl std::fmt::Debug for OidcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OidcClient {{ provider: {}, issuer: {} }}",
            self.registration.provider, self.issuer
        )
    }
}

impl OidcClient {
    pub fn new(
        registration: Registration,
        metadata: ProviderMetadata,
        keys: SigningKeys,
        http: reqwest::Client,
    ) -> Result<Self, FederationError> {
        let parse = |endpoint: &str| {
            Url::parse(endpoint).map_err(|e| FederationError::Discovery(format!("{}: {}", endpoint, e)))
        };

        Ok(Self {
            authorization_endpoint: parse(&metadata.authorization_endpoint)?,
            token_endpoint: parse(&metadata.token_endpoint)?,
            issuer: metadata.issuer,
            registration,
            keys,
            http,
        })
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<IdTokenClaims, FederationError> {
        let invalid = |e: jsonwebtoken::errors::Error| FederationError::Exchange(e.to_string());

        let header = jsonwebtoken::decode_header(id_token).map_err(invalid)?;
        let (n, e) = self.keys.find(header.kid.as_deref()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = ID_TOKEN_LEEWAY_SECS;
        validation.iss = Some(self.issuer.clone());
        validation.set_audience(&[self.registration.client_id.as_str()]);

        let key = DecodingKey::from_rsa_components(&n, &e);
        jsonwebtoken::decode::<IdTokenClaims>(id_token, &key, &validation)
            .map(|data| data.claims)
            .map_err(invalid)
    }
}

#[async_trait]
impl FederatedClient for OidcClient {
    fn authorization_url(&self, nonce: &Nonce) -> Result<Url, FederationError> {
        let params = AuthorizationParams {
            client_id: &self.registration.client_id,
            response_type: "code",
            redirect_uri: self.registration.callback.as_str(),
            scope: &self.registration.scope,
            response_mode: self.registration.response_mode.as_str(),
            nonce: nonce.as_str(),
            state: nonce.as_str(),
        };
        Ok(append_params(self.authorization_endpoint.clone(), params)?)
    }

    async fn exchange(
        &self,
        params: &CallbackParams,
        nonce: &Nonce,
    ) -> Result<ProviderClaims, FederationError> {
        if let Some(error) = &params.error {
            return Err(FederationError::InvalidCallback(error.clone()));
        }
        let code = params
            .code
            .as_deref()
            .ok_or_else(|| FederationError::InvalidCallback("missing authorization code".into()))?;

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.registration.callback.as_str()),
            ("client_id", self.registration.client_id.as_str()),
        ];
        if let Some(secret) = &self.registration.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let exchange = |e: reqwest::Error| FederationError::Exchange(e.to_string());
        let response: TokenEndpointResponse = self
            .http
            .post(self.token_endpoint.clone())
            .form(&form)
            .send()
            .await
            .map_err(exchange)?
            .error_for_status()
            .map_err(exchange)?
            .json()
            .await
            .map_err(exchange)?;

        let claims = self.verify_id_token(&response.id_token).await?;
        if claims.nonce.as_deref() != Some(nonce.as_str()) {
            event!(Level::WARN, provider = %self.registration.provider, "ID token nonce does not match");
            return Err(FederationError::NonceMismatch);
        }

        event!(Level::DEBUG, provider = %self.registration.provider, "Exchanged authorization code");
        Ok(ProviderClaims {
            subject: claims.sub,
            email: claims.email,
        })
    }
}
