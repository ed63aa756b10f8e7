#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use clap::Parser;
use tenant_gateway_config::GatewayConfig;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tenant_gateway_server::api;
use tenant_gateway_server::metrics;
use tenant_gateway_server::state::AppState;
use tenant_gateway_server::store::{HttpManagementClient, HttpStoreClient};

/// Tenant Gateway - multi-tenant HTTP gateway over a healthcare document store.
#[derive(Parser)]
#[command(name = "tenant-gateway")]
#[command(about = "Multi-tenant HTTP gateway over a document store")]
struct Args {
    /// Path to configuration file
    #[arg(short = 'c', long = "config", env = "GATEWAY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => tenant_gateway_config::load_from_file(path).unwrap_or_else(|e| {
            eprintln!("Error: Failed to load config from {path}: {e}");
            std::process::exit(1);
        }),
        None => tenant_gateway_config::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {e}, using defaults");
            GatewayConfig::default()
        }),
    };

    init_logging(&config);

    let store = Arc::new(HttpStoreClient::new(&config.store));
    let management = Arc::new(HttpManagementClient::new(&config.management, &config.store.bucket));
    let state = Arc::new(AppState::new(config.clone(), store, management));

    let request_timeout = Duration::from_secs(config.server.request_timeout_secs);
    let max_concurrent = config.server.max_concurrent_requests;
    let body_limit = config.server.max_body_size_bytes;

    let prometheus_handle = if config.metrics.enabled {
        Some(metrics::init_metrics())
    } else {
        None
    };

    let app = api::create_router(state.clone(), prometheus_handle)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    tracing::info!("tenant gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

fn init_logging(config: &GatewayConfig) {
    let filter = if config.logging.filter.is_empty() {
        config.logging.level.as_str().to_string()
    } else {
        config.logging.filter.clone()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
