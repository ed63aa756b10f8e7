pub mod handlers;
pub mod models;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::auth::auth_middleware;
use crate::metrics::metrics_middleware;
use crate::router::tenant_gate;
use crate::state::AppState;

fn tenant_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/review-request", post(handlers::review_request))
        .route("/{resource}", get(handlers::list_resources))
        .route("/{resource}/{id}", get(handlers::get_resource))
}

pub fn create_router(
    state: Arc<AppState>,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> Router {
    // The last `.layer()` call is the outermost one: requests hit whatever
    // was added last first. We need metrics_middleware first, then
    // auth_middleware, then tenant_gate, then the route handlers, so the
    // calls below add tenant_gate (innermost), then auth_middleware, then
    // metrics_middleware (outermost) last. metrics_middleware wrapping
    // everything means 401/403/503 responses from auth/tenant_gate are
    // still recorded, matching the "Metrics wrapper" step at the front of
    // the control flow. tenant_gate tolerates a request context that isn't
    // there yet (auth hasn't run, e.g. for unauthenticated paths) by
    // forwarding unchanged.
    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::auth_login))
        .route("/auth/refresh", post(handlers::auth_refresh))
        .route("/auth/userinfo", get(handlers::auth_userinfo))
        .nest("/api/{tenant}", tenant_routes())
        .layer(middleware::from_fn_with_state(state.clone(), tenant_gate))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state);

    if let Some(handle) = prometheus_handle {
        router = router.route("/metrics", get(crate::metrics::metrics_handler).with_state(handle));
    }

    router
}
