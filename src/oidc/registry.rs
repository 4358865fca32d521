use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{event, Level};

use super::client::{ClientFactory, FederatedClient};
use super::error::FederationError;
use super::models::Registration;
use crate::core::types::Provider;

/// Lazily discovered clients, at most one per provider for the life of the process.
///
/// Concurrent first requests share a single discovery. A failed discovery
/// leaves the slot empty so the next request tries again.
#[derive(Debug)]
pub struct ClientRegistry {
    registrations: HashMap<Provider, Registration>,
    clients: HashMap<Provider, OnceCell<Arc<dyn FederatedClient>>>,
    factory: Arc<dyn ClientFactory>,
}

impl ClientRegistry {
    pub fn new(registrations: Vec<Registration>, factory: Arc<dyn ClientFactory>) -> Self {
        let clients = registrations
            .iter()
            .map(|r| (r.provider, OnceCell::new()))
            .collect();
        let registrations = registrations.into_iter().map(|r| (r.provider, r)).collect();

        Self {
            registrations,
            clients,
            factory,
        }
    }

    pub fn registration(&self, provider: Provider) -> Option<&Registration> {
        self.registrations.get(&provider)
    }

    /// The client for `provider` if it has already been discovered.
    pub fn get(&self, provider: Provider) -> Option<Arc<dyn FederatedClient>> {
        self.clients.get(&provider)?.get().cloned()
    }

    pub async fn get_or_init(
        &self,
        provider: Provider,
    ) -> Result<Arc<dyn FederatedClient>, FederationError> {
        let (registration, cell) = match (self.registrations.get(&provider), self.clients.get(&provider)) {
            (Some(registration), Some(cell)) => (registration, cell),
            _ => return Err(FederationError::UnsupportedProvider(provider.to_string())),
        };

        let client = cell
            .get_or_try_init(|| async {
                event!(Level::DEBUG, %provider, "Discovering identity provider");
                self.factory.discover(registration).await
            })
            .await?;
        Ok(client.clone())
    }
}
