use axum::{body::Body, extract::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};
use std::time::Instant;

pub fn init_metrics() -> metrics_exporter_prometheus::PrometheusHandle {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Outermost layer: wraps auth and the tenant gate so 401/403/503 responses
/// are recorded too, which means the tenant label has to come straight off
/// the URL rather than the `RequestContext` auth inserts downstream — that
/// extension isn't visible here yet when this middleware runs.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let path_label = normalize_path(&path);

    if path_label == "/metrics" {
        return next.run(request).await;
    }

    let tenant = url_tenant(&path).unwrap_or_else(|| "none".to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method.to_string()),
        ("path", path_label),
        ("status", status),
        ("tenant", tenant),
    ];

    counter!("gateway_http_requests_total", &labels).increment(1);
    histogram!("gateway_http_request_duration_seconds", &labels[..3]).record(duration);

    response
}

/// Folds `/api/{tenant}/...` down to a templated label for the `path`
/// dimension; the separate `tenant` label still carries the literal tenant.
fn normalize_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() >= 3 && parts[1] == "api" {
        return format!(
            "/api/:tenant{}",
            if parts.len() > 3 { format!("/{}", parts[3..].join("/")) } else { String::new() }
        );
    }
    path.to_string()
}

/// Extracts `{tenant}` from a `/api/{tenant}/...` path, independent of
/// whether auth has run or matched a mismatched tenant. Auth-only paths and
/// malformed URLs both yield `None`, which the caller folds to `"none"`.
fn url_tenant(path: &str) -> Option<String> {
    let mut segments = path.trim_start_matches('/').split('/');
    if segments.next() != Some("api") {
        return None;
    }
    segments.next().filter(|t| !t.is_empty()).map(str::to_string)
}

pub async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<
        metrics_exporter_prometheus::PrometheusHandle,
    >,
) -> String {
    handle.render()
}
