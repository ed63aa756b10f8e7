use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::auth::RequestContext;
use crate::dispatcher::Dispatcher;
use crate::error::AppError;
use crate::state::AppState;

/// Thin gatekeeper run after authentication: ensures the tenant namespace
/// exists, brings the tenant's dispatcher up if it is absent or
/// pseudo-closed, pulses its idle timer, then forwards. Reactivation is
/// awaited in full before the request is allowed through.
pub async fn tenant_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(context) = request.extensions().get::<RequestContext>().cloned() else {
        return next.run(request).await;
    };

    if let Err(err) = state.provisioner.ensure_ready(&context.tenant).await {
        error!(tenant = %context.tenant, error = %err, "failed to provision tenant namespace");
        return AppError::from(err).into_response();
    }

    let dispatcher: Arc<Dispatcher> = state.dispatchers.activate(&context.tenant).await;
    dispatcher.pulse_reset();
    request.extensions_mut().insert(dispatcher);

    next.run(request).await
}
