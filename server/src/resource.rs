use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::store::{StoreClient, StoreError};
use crate::time::iso8601_now;

/// The three resource types this gateway exposes. Each maps 1:1 to a
/// per-tenant collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Encounter,
    Patient,
    Practitioner,
}

impl ResourceType {
    #[must_use]
    pub fn as_collection_name(self) -> &'static str {
        match self {
            Self::Encounter => "encounters",
            Self::Patient => "patients",
            Self::Practitioner => "practitioners",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Encounter => "Encounter",
            Self::Patient => "Patient",
            Self::Practitioner => "Practitioner",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseResourceTypeError;

impl fmt::Display for ParseResourceTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown entity type")
    }
}

impl std::error::Error for ParseResourceTypeError {}

/// Case-insensitive, plural-accepting parse: `encounter`, `Encounters`,
/// `PATIENT`, `practitioners` all resolve.
impl FromStr for ResourceType {
    type Err = ParseResourceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        let singular = trimmed.strip_suffix('s').unwrap_or(&trimmed);
        match singular {
            "encounter" => Ok(Self::Encounter),
            "patient" => Ok(Self::Patient),
            "practitioner" => Ok(Self::Practitioner),
            _ => Err(ParseResourceTypeError),
        }
    }
}

/// Canonical document key: `"Type/id"`.
#[must_use]
pub fn document_key(resource_type: ResourceType, id: &str) -> String {
    format!("{resource_type}/{id}")
}

/// An opaque document plus typed accessors for the two reserved attributes
/// the core reads and writes. Everything else in the map passes through
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceDocument(pub serde_json::Map<String, Value>);

impl ResourceDocument {
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                Self(map)
            }
        }
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    #[must_use]
    pub fn reviewed(&self) -> bool {
        self.0.get("reviewed").and_then(Value::as_bool).unwrap_or(false)
    }

    #[must_use]
    pub fn review_time(&self) -> Option<&str> {
        self.0.get("reviewTime").and_then(Value::as_str)
    }

    /// Stamp `reviewed=true` and `reviewTime=now`, preserving every other
    /// attribute (read-modify-write).
    pub fn mark_reviewed(&mut self, now: &str) {
        self.0.insert("reviewed".to_string(), Value::Bool(true));
        self.0.insert("reviewTime".to_string(), Value::String(now.to_string()));
    }
}

/// The `_system/ingestion_status` document shape, shared by the template
/// namespace and every tenant namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionStatus {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub message: String,
}

impl IngestionStatus {
    #[must_use]
    pub fn started(now: &str) -> Self {
        Self {
            ready: false,
            started_at: Some(now.to_string()),
            completed_at: None,
            message: "started".to_string(),
        }
    }

    #[must_use]
    pub fn completed(now: &str) -> Self {
        Self {
            ready: true,
            started_at: None,
            completed_at: Some(now.to_string()),
            message: "completed".to_string(),
        }
    }
}

/// A page of list results plus the pagination envelope fields.
pub struct ListOutcome {
    pub items: Vec<(String, Value)>,
    pub page: u32,
    pub count: u32,
    pub total_items: u64,
    pub has_next: bool,
}

/// Implements get/list/mark-reviewed against a [`StoreClient`], applying
/// this gateway's pagination policy (default `count`, capped maximum,
/// `has_next` derived from the returned page size rather than a second
/// count query).
pub struct ResourceAdapter {
    store: Arc<dyn StoreClient>,
    default_count: u32,
    max_count: u32,
}

impl ResourceAdapter {
    #[must_use]
    pub fn new(store: Arc<dyn StoreClient>, default_count: u32, max_count: u32) -> Self {
        Self { store, default_count, max_count }
    }

    pub async fn get(
        &self,
        tenant: &str,
        resource_type: ResourceType,
        id: &str,
    ) -> Result<Value, StoreError> {
        let key = document_key(resource_type, id);
        self.store.get(tenant, resource_type.as_collection_name(), &key).await
    }

    pub async fn list(
        &self,
        tenant: &str,
        resource_type: ResourceType,
        page: Option<u32>,
        count: Option<u32>,
    ) -> Result<ListOutcome, StoreError> {
        let page = page.unwrap_or(1).max(1);
        let count = count.unwrap_or(self.default_count).clamp(1, self.max_count);
        let offset = (page - 1) * count;

        let result = self
            .store
            .query_page(tenant, resource_type.as_collection_name(), offset, count)
            .await?;

        let has_next = result.documents.len() as u32 == count;
        Ok(ListOutcome {
            items: result.documents,
            page,
            count,
            total_items: result.total_items,
            has_next,
        })
    }

    /// Read-modify-write: fetch the document, stamp `reviewed`/`reviewTime`,
    /// write it back. Every other attribute on the document is preserved.
    pub async fn mark_reviewed(
        &self,
        tenant: &str,
        resource_type: ResourceType,
        id: &str,
    ) -> Result<Value, StoreError> {
        let key = document_key(resource_type, id);
        let collection = resource_type.as_collection_name();

        let current = self.store.get(tenant, collection, &key).await?;
        let mut document = ResourceDocument::from_value(current);
        document.mark_reviewed(&iso8601_now());
        let updated = document.into_value();

        self.store.upsert(tenant, collection, &key, updated.clone()).await?;
        Ok(updated)
    }
}
