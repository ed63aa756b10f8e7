//! Backend interface surface. These are the only components permitted to
//! speak to the document store; everything above this layer is domain logic
//! expressed against [`StoreClient`] and [`ManagementClient`].

mod client;
mod fake;

pub use client::{HttpManagementClient, HttpStoreClient};
pub use fake::InMemoryStore;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("keyspace not found")]
    KeyspaceNotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("store request timed out")]
    Timeout,

    #[error("backend error: {0}")]
    Backend(String),
}

/// A single page of documents plus the total row count observed by the
/// query, used to compute `pagination.totalItems`.
pub struct Page {
    pub documents: Vec<(String, Value)>,
    pub total_items: u64,
}

/// KV get/upsert and paginated query against a named tenant scope.
/// Implemented once per storage technology; the core never reaches past
/// this trait.
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn get(&self, tenant: &str, collection: &str, key: &str) -> Result<Value, StoreError>;

    async fn upsert(
        &self,
        tenant: &str,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<(), StoreError>;

    async fn query_page(
        &self,
        tenant: &str,
        collection: &str,
        offset: u32,
        count: u32,
    ) -> Result<Page, StoreError>;

    /// Trivial query against `tenant.defaulty` used as the namespace
    /// existence probe (spec §4.2 step 1).
    async fn probe_namespace(&self, tenant: &str) -> Result<bool, StoreError>;

    /// Server-side bulk insert of every document in `template_scope.collection`
    /// into `tenant.collection`, keyed by the original document id.
    async fn bulk_copy_from_template(
        &self,
        tenant: &str,
        template_scope: &str,
        collection: &str,
    ) -> Result<(), StoreError>;
}

/// Scope/collection/index administration, reachable through a separate
/// management plane (spec §6 "management host, credentials").
#[async_trait]
pub trait ManagementClient: Send + Sync {
    async fn create_scope(&self, tenant: &str) -> Result<(), StoreError>;

    async fn create_collection(&self, tenant: &str, collection: &str) -> Result<(), StoreError>;

    async fn create_index(
        &self,
        tenant: &str,
        collection: &str,
        index_name: &str,
    ) -> Result<(), StoreError>;
}
