use std::net::SocketAddr;

use clap::Parser;
use url::Url;

use crate::core::types::Provider;
use crate::oidc::models::Registration;
use crate::oidc::types::ResponseMode;
use crate::token::SigningSecret;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    EmptySecret(&'static str),
    #[error("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ")]
    SharedSecret,
    #[error("TOKEN_PURGE_INTERVAL_SECS must be positive")]
    PurgeInterval,
}

#[derive(Debug, Parser)]
#[clap(name = "scribed", version = env!("CARGO_PKG_VERSION"))]
pub struct Config {
    #[clap(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,
    /// Pepper for password hashes
    #[clap(long, env = "HASH_SECRET", hide_env_values = true)]
    pub hash_secret: String,
    #[clap(long, env = "ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub access_token_secret: String,
    #[clap(long, env = "REFRESH_TOKEN_SECRET", hide_env_values = true)]
    pub refresh_token_secret: String,
    #[clap(long, env = "BIND_ADDR", default_value = "0.0.0.0:8001")]
    pub bind_addr: SocketAddr,
    /// Public address of this server, used to build callback addresses
    #[clap(long, env = "BACKEND_SERVER_ADDR")]
    pub backend_server_addr: Url,
    #[clap(long, env = "FRONTEND_SERVER_ADDR")]
    pub frontend_server_addr: Url,
    #[clap(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,
    #[clap(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: Option<String>,
    #[clap(long, env = "GOOGLE_DISCOVERY_URL", default_value = "https://accounts.google.com")]
    pub google_discovery_url: Url,
    #[clap(long, env = "FACEBOOK_CLIENT_ID")]
    pub facebook_client_id: Option<String>,
    #[clap(long, env = "FACEBOOK_CLIENT_SECRET", hide_env_values = true)]
    pub facebook_client_secret: Option<String>,
    #[clap(long, env = "FACEBOOK_DISCOVERY_URL", default_value = "https://www.facebook.com")]
    pub facebook_discovery_url: Url,
    #[clap(long, env = "TOKEN_PURGE_INTERVAL_SECS", default_value = "900")]
    pub token_purge_interval_secs: u64,
}

fn with_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!("{}/{}", base.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    url
}

impl Config {
    /// Access and refresh secrets, refusing empty or shared ones.
    pub fn signing_secrets(&self) -> Result<(SigningSecret, SigningSecret), ConfigError> {
        let access = SigningSecret::new(self.access_token_secret.as_str())
            .map_err(|_| ConfigError::EmptySecret("ACCESS_TOKEN_SECRET"))?;
        let refresh = SigningSecret::new(self.refresh_token_secret.as_str())
            .map_err(|_| ConfigError::EmptySecret("REFRESH_TOKEN_SECRET"))?;

        if access == refresh {
            return Err(ConfigError::SharedSecret);
        }
        Ok((access, refresh))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hash_secret.is_empty() {
            return Err(ConfigError::EmptySecret("HASH_SECRET"));
        }
        if self.token_purge_interval_secs == 0 {
            return Err(ConfigError::PurgeInterval);
        }
        self.signing_secrets().map(|_| ())
    }

    fn callback(&self, provider: Provider) -> Url {
        with_path(
            &self.backend_server_addr,
            &format!("auth/login/{}/callback", provider),
        )
    }

    /// One registration per provider with a configured client id.
    pub fn registrations(&self) -> Vec<Registration> {
        let mut registrations = Vec::new();

        if let Some(client_id) = &self.google_client_id {
            registrations.push(Registration {
                provider: Provider::Google,
                discovery_url: self.google_discovery_url.clone(),
                client_id: client_id.clone(),
                client_secret: self.google_client_secret.clone(),
                callback: self.callback(Provider::Google),
                scope: "openid email profile".to_string(),
                response_mode: ResponseMode::FormPost,
                redirect_to: Some(with_path(&self.frontend_server_addr, "signin/google")),
            });
        }

        if let Some(client_id) = &self.facebook_client_id {
            registrations.push(Registration {
                provider: Provider::Facebook,
                discovery_url: self.facebook_discovery_url.clone(),
                client_id: client_id.clone(),
                client_secret: self.facebook_client_secret.clone(),
                callback: self.callback(Provider::Facebook),
                scope: "openid email public_profile".to_string(),
                response_mode: ResponseMode::Query,
                redirect_to: None,
            });
        }

        registrations
    }

    /// Origins allowed to make credentialed requests.
    pub fn allowed_origins(&self) -> Vec<Url> {
        vec![
            self.frontend_server_addr.clone(),
            self.backend_server_addr.clone(),
        ]
    }
}
