use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody { error: message.to_string() })).into_response()
}

/// The subset of claims this gateway reads. Deliberately not validated
/// against a signature: only the base64url payload segment is decoded, no
/// JWKS lookup or signature check.
///
/// TODO: wire real signature verification before this gateway is exposed
/// outside a trusted network boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub exp: Option<u64>,
    pub preferred_username: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Context derived from the JWT, attached to the request and read by
/// downstream handlers and the tenant router.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant: String,
    pub user_id: String,
    pub username: String,
    pub groups: Vec<String>,
    pub claims: Claims,
}

#[derive(Debug)]
enum AuthFailure {
    MissingOrMalformedHeader,
    InvalidToken,
    EmptyTenantOrMismatch(String),
    MalformedUrl,
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        match self {
            Self::MissingOrMalformedHeader => error_response(StatusCode::UNAUTHORIZED, "missing or malformed authorization header"),
            Self::InvalidToken => error_response(StatusCode::UNAUTHORIZED, "invalid or expired token"),
            Self::EmptyTenantOrMismatch(msg) => error_response(StatusCode::FORBIDDEN, &msg),
            Self::MalformedUrl => error_response(StatusCode::BAD_REQUEST, "malformed request URL"),
        }
    }
}

const BEARER_PREFIX: &str = "Bearer ";

fn decode_claims(token: &str) -> Result<Claims, AuthFailure> {
    let mut segments = token.split('.');
    let _header = segments.next().ok_or(AuthFailure::InvalidToken)?;
    let payload = segments.next().ok_or(AuthFailure::InvalidToken)?;

    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthFailure::InvalidToken)?;

    serde_json::from_slice(&decoded).map_err(|_| AuthFailure::InvalidToken)
}

fn check_claim_window(claims: &Claims) -> Result<(), AuthFailure> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    if let Some(exp) = claims.exp {
        if exp < now {
            return Err(AuthFailure::InvalidToken);
        }
    }
    if let Some(iat) = claims.iat {
        if iat > now {
            return Err(AuthFailure::InvalidToken);
        }
    }
    Ok(())
}

/// Extracts `{tenant}` from a `/api/{tenant}/...` path. Returns `Ok(None)`
/// for paths that don't start with `/api/` (auth-only endpoints, which are
/// acceptable without a tenant binding).
fn extract_url_tenant(path: &str) -> Result<Option<String>, AuthFailure> {
    let trimmed = path.trim_start_matches('/');
    let mut segments = trimmed.split('/');

    match segments.next() {
        Some("api") => {}
        _ => return Ok(None),
    }

    let tenant = segments.next().ok_or(AuthFailure::MalformedUrl)?;
    if tenant.is_empty() {
        return Err(AuthFailure::MalformedUrl);
    }
    Ok(Some(tenant.to_string()))
}

const BYPASS_PATHS: [&str; 3] = ["/", "/health", "/metrics"];

fn bypasses_auth(path: &str) -> bool {
    BYPASS_PATHS.contains(&path) || path.starts_with("/auth/")
}

/// Header parse, unverified claim decode, expiry/not-before check, tenant
/// derivation from `preferred_username`, and a hard cross-check against
/// the URL's tenant segment.
pub async fn auth_middleware(
    State(_state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if bypasses_auth(&path) {
        return next.run(request).await;
    }

    match authenticate(&request, &path) {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(failure) => failure.into_response(),
    }
}

fn authenticate(request: &Request<Body>, path: &str) -> Result<RequestContext, AuthFailure> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthFailure::MissingOrMalformedHeader)?;

    let token = header_value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthFailure::MissingOrMalformedHeader)?;

    let claims = decode_claims(token)?;
    check_claim_window(&claims)?;

    let tenant = claims.preferred_username.trim().to_string();
    if tenant.is_empty() {
        return Err(AuthFailure::EmptyTenantOrMismatch("token has no tenant".to_string()));
    }

    if let Some(url_tenant) = extract_url_tenant(path)? {
        if url_tenant != tenant {
            return Err(AuthFailure::EmptyTenantOrMismatch(
                "tenant in URL does not match JWT token".to_string(),
            ));
        }
    }

    Ok(RequestContext {
        tenant,
        user_id: claims.sub.clone(),
        username: claims.preferred_username.clone(),
        groups: claims.groups.clone(),
        claims,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn encode_segment(value: &serde_json::Value) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(value.to_string())
    }

    fn make_token(claims: &serde_json::Value) -> String {
        let header = encode_segment(&serde_json::json!({"alg": "none", "typ": "JWT"}));
        let payload = encode_segment(claims);
        format!("{header}.{payload}.unsigned")
    }

    #[test]
    fn decodes_well_formed_claims() {
        let token = make_token(&serde_json::json!({
            "sub": "user-1",
            "preferred_username": "acme",
            "groups": ["clinician"],
        }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.preferred_username, "acme");
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn rejects_expired_token() {
        let claims = Claims {
            sub: "user-1".to_string(),
            iat: None,
            exp: Some(1),
            preferred_username: "acme".to_string(),
            groups: vec![],
        };
        assert!(check_claim_window(&claims).is_err());
    }

    #[test]
    fn rejects_premature_token() {
        let far_future = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 10_000;
        let claims = Claims {
            sub: "user-1".to_string(),
            iat: Some(far_future),
            exp: None,
            preferred_username: "acme".to_string(),
            groups: vec![],
        };
        assert!(check_claim_window(&claims).is_err());
    }

    #[test]
    fn extracts_tenant_from_api_path() {
        assert_eq!(extract_url_tenant("/api/acme/patients").unwrap(), Some("acme".to_string()));
    }

    #[test]
    fn non_api_paths_have_no_tenant() {
        assert_eq!(extract_url_tenant("/auth/login").unwrap(), None);
    }

    #[test]
    fn malformed_api_path_is_rejected() {
        assert!(extract_url_tenant("/api").is_err());
        assert!(extract_url_tenant("/api/").is_err());
    }

    #[test]
    fn bypass_paths_skip_auth() {
        assert!(bypasses_auth("/health"));
        assert!(bypasses_auth("/auth/login"));
        assert!(!bypasses_auth("/api/acme/patients"));
    }

    #[test]
    fn authenticate_populates_username_and_full_claim_set() {
        let token = make_token(&serde_json::json!({
            "sub": "user-1",
            "preferred_username": "acme",
            "groups": ["clinician"],
        }));
        let request = Request::builder()
            .uri("/api/acme/patients")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let context = authenticate(&request, "/api/acme/patients").unwrap();
        assert_eq!(context.tenant, "acme");
        assert_eq!(context.username, "acme");
        assert_eq!(context.user_id, "user-1");
        assert_eq!(context.claims.preferred_username, "acme");
        assert_eq!(context.claims.groups, vec!["clinician".to_string()]);
    }
}
