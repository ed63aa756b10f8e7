use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::models::{ListItem, ListQuery, ListResponse, Pagination, ReviewRequestBody, ReviewResponse};
use crate::auth::RequestContext;
use crate::dispatcher::{DispatchResult, Dispatcher, Operation};
use crate::error::AppError;
use crate::resource::ResourceType;
use crate::state::AppState;

pub type AppResult<T> = Result<T, AppError>;

/// Liveness banner, unauthenticated.
pub async fn root() -> &'static str {
    "tenant gateway is running"
}

/// Unauthenticated readiness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn submit(
    dispatcher: &Dispatcher,
    state: &AppState,
    operation: Operation,
) -> AppResult<DispatchResult> {
    dispatcher.submit(operation, state.dispatchers.request_timeout()).await
}

pub async fn list_resources(
    Path((_tenant, resource_segment)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    let resource_type = ResourceType::from_str(&resource_segment)
        .map_err(|_| AppError::InputError(format!("unknown resource type '{resource_segment}'")))?;

    let result = submit(
        &dispatcher,
        &state,
        Operation::List { resource_type, page: query.page, count: query.count },
    )
    .await?;

    let DispatchResult::List(outcome) = result else {
        return Err(AppError::Backend("dispatcher returned wrong result shape".to_string()));
    };

    Ok(Json(ListResponse {
        data: outcome
            .items
            .into_iter()
            .map(|(id, resource)| ListItem { id, resource })
            .collect(),
        pagination: Pagination {
            page: outcome.page,
            count: outcome.count,
            offset: (outcome.page - 1) * outcome.count,
            total_items: outcome.total_items,
            has_next: outcome.has_next,
        },
    }))
}

pub async fn get_resource(
    Path((_tenant, resource_segment, id)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
) -> AppResult<Json<serde_json::Value>> {
    let resource_type = ResourceType::from_str(&resource_segment)
        .map_err(|_| AppError::InputError(format!("unknown resource type '{resource_segment}'")))?;

    let result = submit(&dispatcher, &state, Operation::Get { resource_type, id }).await?;

    let DispatchResult::Document(value) = result else {
        return Err(AppError::Backend("dispatcher returned wrong result shape".to_string()));
    };
    Ok(Json(value))
}

pub async fn review_request(
    Path(tenant): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Extension(context): Extension<RequestContext>,
    Json(body): Json<ReviewRequestBody>,
) -> AppResult<Json<ReviewResponse>> {
    let resource_type = ResourceType::from_str(&body.entity)
        .map_err(|_| AppError::InputError(format!("unknown entity '{}'", body.entity)))?;

    submit(
        &dispatcher,
        &state,
        Operation::MarkReviewed { resource_type, id: body.id.clone() },
    )
    .await?;

    debug_assert_eq!(context.tenant, tenant);

    Ok(Json(ReviewResponse {
        status: "review requested".to_string(),
        tenant,
        entity: format!("{resource_type}/{}", body.id),
        reviewed: "true".to_string(),
    }))
}

/// Thin proxy to the external identity provider. Business logic (password
/// checking, refresh token rotation) lives entirely upstream; this handler
/// only forwards the request body and relays the response, through the
/// circuit breaker that guards every call to that collaborator.
pub async fn auth_login(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> AppResult<axum::response::Response> {
    proxy_to_identity(&state, "/login", body).await
}

pub async fn auth_refresh(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> AppResult<axum::response::Response> {
    proxy_to_identity(&state, "/refresh", body).await
}

pub async fn auth_userinfo(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> AppResult<axum::response::Response> {
    if !state.identity_breaker.allow_request().await {
        return Err(AppError::NotReady("identity provider circuit open".to_string()));
    }

    let Some(base_url) = state.config.identity.base_url.as_ref() else {
        return Err(AppError::NotReady("identity provider not configured".to_string()));
    };

    let mut request = state.identity_client.get(format!("{base_url}/userinfo"));
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION) {
        request = request.header(axum::http::header::AUTHORIZATION, auth);
    }

    match request.send().await {
        Ok(response) => {
            state.identity_breaker.record_success().await;
            relay(response).await
        }
        Err(err) => {
            state.identity_breaker.record_failure().await;
            Err(AppError::Backend(err.to_string()))
        }
    }
}

async fn proxy_to_identity(
    state: &AppState,
    path: &str,
    body: axum::body::Bytes,
) -> AppResult<axum::response::Response> {
    if !state.identity_breaker.allow_request().await {
        return Err(AppError::NotReady("identity provider circuit open".to_string()));
    }

    let Some(base_url) = state.config.identity.base_url.as_ref() else {
        return Err(AppError::NotReady("identity provider not configured".to_string()));
    };

    let result = state
        .identity_client
        .post(format!("{base_url}{path}"))
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await;

    match result {
        Ok(response) => {
            state.identity_breaker.record_success().await;
            relay(response).await
        }
        Err(err) => {
            state.identity_breaker.record_failure().await;
            Err(AppError::Backend(err.to_string()))
        }
    }
}

async fn relay(response: reqwest::Response) -> AppResult<axum::response::Response> {
    let status = response.status();
    let body = response.bytes().await.map_err(|err| AppError::Backend(err.to_string()))?;
    let status = axum::http::StatusCode::from_u16(status.as_u16())
        .unwrap_or(axum::http::StatusCode::BAD_GATEWAY);
    Ok((status, body).into_response())
}
