use std::sync::Arc;
use std::time::Duration;

use tokio::task::block_in_place;
use tracing::{event, Level};

use crate::config::{Config, ConfigError};
use crate::db::{DbStore, StoreError};
use crate::http::server::{AuthContext, Server};
use crate::oidc::client::Discovery;
use crate::oidc::{ClientRegistry, FederationCoordinator, FederationError};
use crate::token::TokenService;
use crate::util::hash::HashingService;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Federation(#[from] FederationError),
}

async fn start_purge_worker(tokens: Arc<TokenService>, period: Duration) {
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;
        match tokens.purge_expired().await {
            Ok(removed) => event!(Level::DEBUG, removed, "Purged expired refresh tokens"),
            Err(e) => event!(Level::ERROR, error = %e, "Failed to purge refresh tokens"),
        }
    }
}

pub async fn scribed(config: Config) -> Result<(), DaemonError> {
    config.validate()?;
    let (access_secret, refresh_secret) = config.signing_secrets()?;

    let hasher = HashingService::with_secret_key(config.hash_secret.clone());
    let store = Arc::new(DbStore::acquire(&config.database_url, hasher)?);
    block_in_place(|| store.migrate())?;

    let tokens = Arc::new(TokenService::new(
        &access_secret,
        &refresh_secret,
        store.clone(),
    ));

    let registrations = config.registrations();
    for registration in &registrations {
        event!(Level::INFO, provider = %registration.provider, "Registered identity provider");
    }
    let registry = ClientRegistry::new(registrations, Arc::new(Discovery::new()?));
    let federation = FederationCoordinator::new(registry, tokens.clone(), store.clone());

    let context = Arc::new(AuthContext {
        tokens: tokens.clone(),
        users: store,
        federation,
    });

    let _purge = {
        let period = Duration::from_secs(config.token_purge_interval_secs);
        tokio::spawn(start_purge_worker(tokens, period))
    };

    event!(Level::INFO, addr = %config.bind_addr, "Serving");
    Server::new(context, config.allowed_origins())
        .serve(config.bind_addr)
        .await;
    Ok(())
}
