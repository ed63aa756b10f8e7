use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::to_value;
use tenant_gateway_config::ProvisioningConfig;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::resource::{IngestionStatus, ResourceType};
use crate::store::{ManagementClient, StoreClient, StoreError};
use crate::time::iso8601_now;

const SYSTEM_COLLECTION: &str = "defaulty";
const INGESTION_STATUS_KEY: &str = "_system/ingestion_status";
const RESOURCE_TYPES: [ResourceType; 3] = [
    ResourceType::Encounter,
    ResourceType::Patient,
    ResourceType::Practitioner,
];

/// Ensures a tenant's scope, collections, indexes, and template data exist
/// and are queryable before any request is dispatched on its behalf.
///
/// Concurrent `ensure_ready` calls for the same tenant are coalesced onto
/// one in-flight provisioning attempt via a per-tenant mutex slot, rather
/// than letting every caller race the store's "already exists" handling.
pub struct NamespaceProvisioner {
    store: Arc<dyn StoreClient>,
    management: Arc<dyn ManagementClient>,
    template_scope: String,
    config: ProvisioningConfig,
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl NamespaceProvisioner {
    #[must_use]
    pub fn new(
        store: Arc<dyn StoreClient>,
        management: Arc<dyn ManagementClient>,
        template_scope: String,
        config: ProvisioningConfig,
    ) -> Self {
        Self {
            store,
            management,
            template_scope,
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn slot_for(&self, tenant: &str) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().await;
        slots.entry(tenant.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Idempotent. Returns once the tenant namespace is confirmed ready, or
    /// an error if provisioning or the readiness wait fails.
    pub async fn ensure_ready(&self, tenant: &str) -> Result<(), StoreError> {
        let slot = self.slot_for(tenant).await;
        let _guard = slot.lock().await;

        if self.store.probe_namespace(tenant).await? {
            return Ok(());
        }

        self.assert_template_ready().await?;

        info!(tenant = %tenant, "provisioning tenant namespace");
        self.create(tenant).await?;
        self.wait_until_ready(tenant).await?;
        info!(tenant = %tenant, "tenant namespace ready");
        Ok(())
    }

    /// No tenant namespace is serviceable until the shared template reports
    /// `ready=true` (its own `defaulty/_system/ingestion_status`, populated
    /// once by the external ingestion job). A template that is still
    /// ingesting, or hasn't been bootstrapped at all, surfaces the same
    /// `NotReady` 503 a caller would see for an unready tenant namespace.
    async fn assert_template_ready(&self) -> Result<(), StoreError> {
        match self.store.get(&self.template_scope, SYSTEM_COLLECTION, INGESTION_STATUS_KEY).await {
            Ok(value) => {
                let ready = value.get("ready").and_then(serde_json::Value::as_bool).unwrap_or(false);
                if ready {
                    Ok(())
                } else {
                    warn!(template = %self.template_scope, "template namespace still ingesting");
                    Err(StoreError::KeyspaceNotFound)
                }
            }
            Err(StoreError::NotFound) => {
                warn!(template = %self.template_scope, "template namespace has no ingestion status yet");
                Err(StoreError::KeyspaceNotFound)
            }
            Err(err) => Err(err),
        }
    }

    async fn create(&self, tenant: &str) -> Result<(), StoreError> {
        match self.management.create_scope(tenant).await {
            Ok(()) | Err(StoreError::AlreadyExists) => {}
            Err(err) => return Err(err),
        }

        match self.management.create_collection(tenant, SYSTEM_COLLECTION).await {
            Ok(()) | Err(StoreError::AlreadyExists) => {}
            Err(err) => return Err(err),
        }
        self.create_index_best_effort(tenant, SYSTEM_COLLECTION, "idx_defaulty_id").await;
        self.create_index_best_effort(tenant, SYSTEM_COLLECTION, "idx_defaulty_ready").await;

        for resource_type in RESOURCE_TYPES {
            let collection = resource_type.as_collection_name();
            match self.management.create_collection(tenant, collection).await {
                Ok(()) | Err(StoreError::AlreadyExists) => {}
                Err(err) => return Err(err),
            }

            // Index creation failures are logged and otherwise ignored: a
            // missing secondary index degrades query performance, it does
            // not make the namespace unusable.
            for suffix in ["id", "resourceType", "reviewed"] {
                let index_name = format!("idx_{collection}_{suffix}");
                self.create_index_best_effort(tenant, collection, &index_name).await;
            }
        }

        let started = IngestionStatus::started(&iso8601_now());
        let started_value = to_value(&started).expect("IngestionStatus always serializes");
        self.store
            .upsert(tenant, SYSTEM_COLLECTION, INGESTION_STATUS_KEY, started_value)
            .await?;

        for resource_type in RESOURCE_TYPES {
            let collection = resource_type.as_collection_name();
            self.store.bulk_copy_from_template(tenant, &self.template_scope, collection).await?;
        }

        let completed = IngestionStatus::completed(&iso8601_now());
        let completed_value = to_value(&completed).expect("IngestionStatus always serializes");
        self.store
            .upsert(tenant, SYSTEM_COLLECTION, INGESTION_STATUS_KEY, completed_value)
            .await
    }

    async fn create_index_best_effort(&self, tenant: &str, collection: &str, index_name: &str) {
        if let Err(err) = self.management.create_index(tenant, collection, index_name).await {
            warn!(tenant = %tenant, collection = %collection, index = %index_name, error = %err, "index creation failed, continuing");
        }
    }

    async fn wait_until_ready(&self, tenant: &str) -> Result<(), StoreError> {
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.ready_timeout_secs);
        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);

        loop {
            let status = self.store.get(tenant, SYSTEM_COLLECTION, INGESTION_STATUS_KEY).await;
            match status {
                Ok(value) => {
                    let ready = value.get("ready").and_then(serde_json::Value::as_bool).unwrap_or(false);
                    if ready {
                        return Ok(());
                    }
                }
                Err(StoreError::NotFound) => {}
                Err(err) => return Err(err),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(StoreError::Backend(format!(
                    "tenant namespace did not become ready within {}s",
                    self.config.ready_timeout_secs
                )));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
