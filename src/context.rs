//! # Controller Context
//!
//! Shared handles created once at startup and passed to every component:
//! the base API client and the lazily derived hub configuration.

use crate::hub::{HubConfigCache, HubConfigError};
use crate::resolver::ObjectResolver;
use kube::{Client, Config};
use std::sync::Arc;
use tracing::{error, info};

pub struct ControllerContext {
    client: Client,
    hub: HubConfigCache,
}

impl std::fmt::Debug for ControllerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerContext")
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}

impl ControllerContext {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            hub: HubConfigCache::new(),
        }
    }

    /// Build the base client from `config`
    ///
    /// # Errors
    ///
    /// Fails when the client cannot be constructed (e.g. bad TLS material).
    pub fn from_config(config: Config) -> Result<Self, kube::Error> {
        let client = Client::try_from(config)?;
        Ok(Self::new(client))
    }

    #[must_use]
    pub fn resolver(&self) -> ObjectResolver {
        ObjectResolver::new(self.client.clone())
    }

    /// Hub configuration from the `secret_name` bundle in `namespace`
    ///
    /// Derived on the first call only; every later call returns the same value.
    ///
    /// # Errors
    ///
    /// See [`HubConfigError`].
    pub async fn load_hub_config(
        &self,
        namespace: &str,
        secret_name: &str,
    ) -> Result<Arc<Config>, HubConfigError> {
        self.hub
            .get_or_load(&self.client, namespace, secret_name)
            .await
    }

    /// A client for the hub cluster, built from the cached hub configuration
    ///
    /// # Errors
    ///
    /// See [`Self::load_hub_config`]; [`HubConfigError::Client`] if the client
    /// cannot be built from the derived configuration.
    pub async fn hub_client(
        &self,
        namespace: &str,
        secret_name: &str,
    ) -> Result<Client, HubConfigError> {
        let config = self.load_hub_config(namespace, secret_name).await?;
        Client::try_from((*config).clone()).map_err(HubConfigError::Client)
    }

    /// Hub client for status reporting, or `None` when the hub is unreachable
    ///
    /// Status reporting is optional, so a failed load is logged and the
    /// controller keeps running without it. The cache stays empty and a later
    /// call tries again.
    pub async fn bootstrap_hub(&self, namespace: &str, secret_name: &str) -> Option<Client> {
        match self.hub_client(namespace, secret_name).await {
            Ok(client) => {
                info!("hub client ready from secret {}/{}", namespace, secret_name);
                Some(client)
            }
            Err(e) => {
                error!(
                    "continuing without hub status reporting, secret {}/{}: {}",
                    namespace, secret_name, e
                );
                None
            }
        }
    }
}
