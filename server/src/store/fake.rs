use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ManagementClient, Page, StoreClient, StoreError};

type Collection = HashMap<String, Value>;
type Scope = HashMap<String, Collection>;

/// In-memory stand-in for both [`StoreClient`] and [`ManagementClient`],
/// used by unit tests and the integration harness so the dispatcher and
/// HTTP layer can be exercised without a real document store.
#[derive(Default)]
pub struct InMemoryStore {
    scopes: Mutex<HashMap<String, Scope>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: seed a document directly, bypassing the trait.
    pub fn seed(&self, tenant: &str, collection: &str, key: &str, document: Value) {
        let mut scopes = self.scopes.lock().unwrap();
        scopes
            .entry(tenant.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), document);
    }
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn get(&self, tenant: &str, collection: &str, key: &str) -> Result<Value, StoreError> {
        let scopes = self.scopes.lock().unwrap();
        let scope = scopes.get(tenant).ok_or(StoreError::KeyspaceNotFound)?;
        let coll = scope.get(collection).ok_or(StoreError::KeyspaceNotFound)?;
        coll.get(key).cloned().ok_or(StoreError::NotFound)
    }

    async fn upsert(
        &self,
        tenant: &str,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<(), StoreError> {
        let mut scopes = self.scopes.lock().unwrap();
        let scope = scopes.get_mut(tenant).ok_or(StoreError::KeyspaceNotFound)?;
        let coll = scope.get_mut(collection).ok_or(StoreError::KeyspaceNotFound)?;
        coll.insert(key.to_string(), document);
        Ok(())
    }

    async fn query_page(
        &self,
        tenant: &str,
        collection: &str,
        offset: u32,
        count: u32,
    ) -> Result<Page, StoreError> {
        let scopes = self.scopes.lock().unwrap();
        let scope = scopes.get(tenant).ok_or(StoreError::KeyspaceNotFound)?;
        let coll = scope.get(collection).ok_or(StoreError::KeyspaceNotFound)?;

        let mut entries: Vec<(String, Value)> =
            coll.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let total_items = entries.len() as u64;
        let documents = entries
            .into_iter()
            .skip(offset as usize)
            .take(count as usize)
            .collect();

        Ok(Page { documents, total_items })
    }

    async fn probe_namespace(&self, tenant: &str) -> Result<bool, StoreError> {
        let scopes = self.scopes.lock().unwrap();
        Ok(scopes.contains_key(tenant))
    }

    async fn bulk_copy_from_template(
        &self,
        tenant: &str,
        template_scope: &str,
        collection: &str,
    ) -> Result<(), StoreError> {
        let mut scopes = self.scopes.lock().unwrap();
        let template_docs = scopes
            .get(template_scope)
            .and_then(|s| s.get(collection))
            .cloned()
            .unwrap_or_default();

        let scope = scopes.get_mut(tenant).ok_or(StoreError::KeyspaceNotFound)?;
        scope.entry(collection.to_string()).or_default().extend(template_docs);
        Ok(())
    }
}

#[async_trait]
impl ManagementClient for InMemoryStore {
    async fn create_scope(&self, tenant: &str) -> Result<(), StoreError> {
        let mut scopes = self.scopes.lock().unwrap();
        if scopes.contains_key(tenant) {
            return Err(StoreError::AlreadyExists);
        }
        scopes.insert(tenant.to_string(), Scope::default());
        Ok(())
    }

    async fn create_collection(&self, tenant: &str, collection: &str) -> Result<(), StoreError> {
        let mut scopes = self.scopes.lock().unwrap();
        let scope = scopes.get_mut(tenant).ok_or(StoreError::KeyspaceNotFound)?;
        if scope.contains_key(collection) {
            return Err(StoreError::AlreadyExists);
        }
        scope.insert(collection.to_string(), Collection::default());
        Ok(())
    }

    async fn create_index(
        &self,
        _tenant: &str,
        _collection: &str,
        _index_name: &str,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn probe_reports_false_until_scope_created() {
        let store = InMemoryStore::new();
        assert!(!store.probe_namespace("acme").await.unwrap());
        store.create_scope("acme").await.unwrap();
        assert!(store.probe_namespace("acme").await.unwrap());
    }

    #[tokio::test]
    async fn get_missing_collection_is_keyspace_not_found() {
        let store = InMemoryStore::new();
        store.create_scope("acme").await.unwrap();
        let err = store.get("acme", "patients", "Patient/1").await.unwrap_err();
        assert!(matches!(err, StoreError::KeyspaceNotFound));
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = InMemoryStore::new();
        store.create_scope("acme").await.unwrap();
        store.create_collection("acme", "patients").await.unwrap();
        store
            .upsert("acme", "patients", "Patient/1", json!({"name": "Jane"}))
            .await
            .unwrap();
        let doc = store.get("acme", "patients", "Patient/1").await.unwrap();
        assert_eq!(doc["name"], "Jane");
    }

    #[tokio::test]
    async fn query_page_applies_offset_and_count() {
        let store = InMemoryStore::new();
        store.create_scope("acme").await.unwrap();
        store.create_collection("acme", "patients").await.unwrap();
        for i in 0..5 {
            store
                .upsert("acme", "patients", &format!("Patient/{i}"), json!({"n": i}))
                .await
                .unwrap();
        }
        let page = store.query_page("acme", "patients", 2, 2).await.unwrap();
        assert_eq!(page.total_items, 5);
        assert_eq!(page.documents.len(), 2);
    }

    #[tokio::test]
    async fn bulk_copy_from_template_seeds_tenant_collection() {
        let store = InMemoryStore::new();
        store.seed("template", "patients", "Patient/seed", json!({"template": true}));
        store.create_scope("acme").await.unwrap();
        store.create_collection("acme", "patients").await.unwrap();
        store
            .bulk_copy_from_template("acme", "template", "patients")
            .await
            .unwrap();
        let doc = store.get("acme", "patients", "Patient/seed").await.unwrap();
        assert_eq!(doc["template"], true);
    }
}
