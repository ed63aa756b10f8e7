use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tenant_gateway_config::{ManagementConfig, StoreConfig};

use super::{ManagementClient, Page, StoreClient, StoreError};

/// Query-service client for a Couchbase-style document store: KV get/upsert
/// plus N1QL-shaped queries scoped to `bucket.tenant.collection`.
#[derive(Clone)]
pub struct HttpStoreClient {
    client: Client,
    base_url: String,
    bucket: String,
    username: String,
    password: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    statement: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    args: Vec<Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    metrics: QueryMetrics,
}

#[derive(Deserialize, Default)]
struct QueryMetrics {
    #[serde(rename = "resultCount")]
    result_count: Option<u64>,
}

impl HttpStoreClient {
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .expect("failed to build store HTTP client");

        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    async fn query(&self, statement: &str, args: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let url = format!("{}/query/service", self.base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&QueryRequest { statement, args })
            .send()
            .await
            .map_err(map_reqwest_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if body.contains("keyspace not found") || body.contains("Keyspace not found") {
                return Err(StoreError::KeyspaceNotFound);
            }
            return Err(StoreError::Backend(format!("HTTP {status}: {body}")));
        }

        let parsed: QueryResponse = response.json().await.map_err(map_reqwest_err)?;
        Ok(parsed.results)
    }
}

fn map_reqwest_err(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn get(&self, tenant: &str, collection: &str, key: &str) -> Result<Value, StoreError> {
        let keyspace = format!("`{}`.`{tenant}`.`{collection}`", self.bucket);
        let statement = format!("SELECT RAW d FROM {keyspace} AS d USE KEYS $1");
        let results = self.query(&statement, vec![Value::String(key.to_string())]).await?;
        results.into_iter().next().ok_or(StoreError::NotFound)
    }

    async fn upsert(
        &self,
        tenant: &str,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<(), StoreError> {
        let keyspace = format!("`{}`.`{tenant}`.`{collection}`", self.bucket);
        let statement = format!("UPSERT INTO {keyspace} (KEY, VALUE) VALUES ($1, $2)");
        self.query(&statement, vec![Value::String(key.to_string()), document])
            .await?;
        Ok(())
    }

    async fn query_page(
        &self,
        tenant: &str,
        collection: &str,
        offset: u32,
        count: u32,
    ) -> Result<Page, StoreError> {
        let keyspace = format!("`{}`.`{tenant}`.`{collection}`", self.bucket);
        let statement = format!(
            "SELECT META(d).id AS id, d AS resource FROM {keyspace} AS d ORDER BY META(d).id OFFSET {offset} LIMIT {count}"
        );
        let rows = self.query(&statement, Vec::new()).await?;

        let count_stmt = format!("SELECT RAW COUNT(1) FROM {keyspace}");
        let count_rows = self.query(&count_stmt, Vec::new()).await?;
        let total_items = count_rows
            .first()
            .and_then(Value::as_u64)
            .unwrap_or_else(|| rows.len() as u64);

        let documents = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id")?.as_str()?.to_string();
                let resource = row.get("resource")?.clone();
                Some((id, resource))
            })
            .collect();

        Ok(Page { documents, total_items })
    }

    async fn probe_namespace(&self, tenant: &str) -> Result<bool, StoreError> {
        match self.get(tenant, "defaulty", "_system/ingestion_status").await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound) => Ok(true), // keyspace exists, document doesn't
            Err(StoreError::KeyspaceNotFound) => Ok(false),
            Err(other) => Err(other),
        }
    }

    async fn bulk_copy_from_template(
        &self,
        tenant: &str,
        template_scope: &str,
        collection: &str,
    ) -> Result<(), StoreError> {
        let dst = format!("`{}`.`{tenant}`.`{collection}`", self.bucket);
        let src = format!("`{}`.`{template_scope}`.`{collection}`", self.bucket);
        let statement =
            format!("INSERT INTO {dst} (KEY, VALUE) SELECT META(d).id, d FROM {src} AS d");
        self.query(&statement, Vec::new()).await?;
        Ok(())
    }
}

/// Administrative client against the store's management API — scope,
/// collection, and index creation live on a separate plane from the query
/// service (spec §6).
#[derive(Clone)]
pub struct HttpManagementClient {
    client: Client,
    base_url: String,
    bucket: String,
    username: String,
    password: String,
}

impl HttpManagementClient {
    #[must_use]
    pub fn new(config: &ManagementConfig, bucket: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build management HTTP client");

        Self {
            client,
            base_url: config.host.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    async fn post_admin(&self, path: &str, form: &[(&str, &str)]) -> Result<(), StoreError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .form(form)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 400 && body.to_lowercase().contains("already exist") {
            return Err(StoreError::AlreadyExists);
        }
        Err(StoreError::Backend(format!("HTTP {status}: {body}")))
    }
}

#[async_trait]
impl ManagementClient for HttpManagementClient {
    async fn create_scope(&self, tenant: &str) -> Result<(), StoreError> {
        let path = format!("/pools/default/buckets/{}/scopes", self.bucket);
        self.post_admin(&path, &[("name", tenant)]).await
    }

    async fn create_collection(&self, tenant: &str, collection: &str) -> Result<(), StoreError> {
        let path = format!(
            "/pools/default/buckets/{}/scopes/{tenant}/collections",
            self.bucket
        );
        self.post_admin(&path, &[("name", collection)]).await
    }

    async fn create_index(
        &self,
        tenant: &str,
        collection: &str,
        index_name: &str,
    ) -> Result<(), StoreError> {
        let path = "/indexer/internal/create".to_string();
        let keyspace = format!("{}.{tenant}.{collection}", self.bucket);
        self.post_admin(&path, &[("keyspace", &keyspace), ("index", index_name)])
            .await
    }
}
