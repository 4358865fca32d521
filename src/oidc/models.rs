use url::Url;

use super::types::ResponseMode;
use crate::core::types::Provider;

/// Everything needed to talk to one identity provider.
#[derive(Debug, Clone)]
pub struct Registration {
    pub provider: Provider,
    pub discovery_url: Url,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub callback: Url,
    pub scope: String,
    pub response_mode: ResponseMode,
    /// Where to send the browser after a successful login. Tokens are
    /// returned as JSON when unset.
    pub redirect_to: Option<Url>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
}

/// Parameters the provider sends back to the callback address.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// The assertion about the user that survives a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderClaims {
    pub subject: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    pub nonce: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TokenEndpointResponse {
    pub id_token: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// The RSA key matching `kid`, or the only RSA key when the token names none.
    pub fn find_rsa(&self, kid: Option<&str>) -> Option<(&str, &str)> {
        let mut rsa = self
            .keys
            .iter()
            .filter(|k| k.kty == "RSA")
            .filter_map(|k| Some((k.kid.as_deref(), k.n.as_deref()?, k.e.as_deref()?)));

        match kid {
            Some(kid) => rsa
                .find(|(candidate, _, _)| *candidate == Some(kid))
                .map(|(_, n, e)| (n, e)),
            None => {
                let first = rsa.next()?;
                match rsa.next() {
                    Some(_) => None,
                    None => Some((first.1, first.2)),
                }
            }
        }
    }
}
