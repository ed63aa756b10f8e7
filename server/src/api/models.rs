use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /api/{tenant}/{resource}` query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub count: u32,
    pub offset: u32,
    #[serde(rename = "totalItems")]
    pub total_items: u64,
    #[serde(rename = "hasNext")]
    pub has_next: bool,
}

/// One row of a list response: the document's canonical id alongside its
/// body. The store only guarantees the id via the `"Type/id"` key under
/// which it's addressed, not as a field inside the document body itself.
#[derive(Debug, Serialize)]
pub struct ListItem {
    pub id: String,
    pub resource: Value,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<ListItem>,
    pub pagination: Pagination,
}

/// `POST /api/{tenant}/review-request` body.
#[derive(Debug, Deserialize)]
pub struct ReviewRequestBody {
    pub entity: String,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub status: String,
    pub tenant: String,
    pub entity: String,
    pub reviewed: String,
}
