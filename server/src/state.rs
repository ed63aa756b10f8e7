use std::sync::Arc;

use reqwest::Client;
use tenant_gateway_config::GatewayConfig;

use crate::circuit_breaker::CircuitBreaker;
use crate::dispatcher::DispatcherRegistry;
use crate::resource::ResourceAdapter;
use crate::store::{ManagementClient, StoreClient};
use crate::tenant::NamespaceProvisioner;

/// Shared service container threaded through every handler via axum's
/// `State` extractor. Everything that talks to an external collaborator
/// (store, management plane, identity provider) is reached only through
/// the narrow trait objects held here.
pub struct AppState {
    pub config: GatewayConfig,
    pub provisioner: Arc<NamespaceProvisioner>,
    pub dispatchers: Arc<DispatcherRegistry>,
    pub identity_client: Client,
    pub identity_breaker: Arc<CircuitBreaker>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn StoreClient>,
        management: Arc<dyn ManagementClient>,
    ) -> Self {
        let adapter = Arc::new(ResourceAdapter::new(
            Arc::clone(&store),
            config.pagination.default_count,
            config.pagination.max_count,
        ));

        let provisioner = Arc::new(NamespaceProvisioner::new(
            store,
            management,
            config.store.template_scope.clone(),
            config.provisioning.clone(),
        ));

        let dispatchers = Arc::new(DispatcherRegistry::new(adapter, &config.dispatcher));

        let identity_client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build identity provider HTTP client");

        let identity_breaker = Arc::new(CircuitBreaker::new(5, std::time::Duration::from_secs(30)));

        Self {
            config,
            provisioner,
            dispatchers,
            identity_client,
            identity_breaker,
        }
    }
}
