use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

use crate::store::StoreError;

/// Application-level error taxonomy. Each variant maps to exactly one HTTP
/// status code at the boundary; adapters and the dispatcher worker propagate
/// these unchanged from the store up to the handler.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InputError(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotReady(String),

    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

impl AppError {
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::InputError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = ErrorBody {
            error: short_label(&self),
            message: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

fn short_label(err: &AppError) -> String {
    match err {
        AppError::InputError(_) => "bad request".to_string(),
        AppError::Unauthorized(_) => "unauthorized".to_string(),
        AppError::Forbidden(_) => "forbidden".to_string(),
        AppError::NotReady(_) => "not ready".to_string(),
        AppError::Timeout => "request timeout".to_string(),
        AppError::NotFound(_) => "resource not found".to_string(),
        AppError::Backend(_) => "backend error".to_string(),
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("resource not found".to_string()),
            StoreError::KeyspaceNotFound => Self::NotReady("tenant namespace not ready".to_string()),
            StoreError::AlreadyExists => Self::Backend("unexpected already-exists error".to_string()),
            StoreError::Timeout => Self::Timeout,
            StoreError::Backend(msg) => Self::Backend(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(AppError::InputError("x".into()).http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x".into()).http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).http_status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotReady("x".into()).http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::Timeout.http_status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(AppError::NotFound("x".into()).http_status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Backend("x".into()).http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_not_found_maps_to_app_not_found() {
        let app_err: AppError = StoreError::NotFound.into();
        assert_eq!(app_err.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_keyspace_not_found_maps_to_503_not_500() {
        let app_err: AppError = StoreError::KeyspaceNotFound.into();
        assert_eq!(app_err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn store_backend_error_maps_to_500() {
        let app_err: AppError = StoreError::Backend("provisioning call failed".to_string()).into();
        assert_eq!(app_err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
