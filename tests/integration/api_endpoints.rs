//! Integration tests for the control API
//!
//! A real server is bound on a random port and driven with reqwest.

use std::net::SocketAddr;
use std::sync::Arc;

use health_monitoring::{
    Registry,
    api::{ApiConfig, ApiState, BasicResponse, spawn_api_server},
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

async fn spawn_test_api() -> (SocketAddr, Arc<Registry>) {
    let registry = Arc::new(Registry::new());
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        auth_token: Some(TOKEN.to_string()),
        enable_cors: true,
    };

    let addr = spawn_api_server(config, ApiState::new(registry.clone()))
        .await
        .unwrap();
    (addr, registry)
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

async fn post(addr: SocketAddr, kind: &str, body: Value) -> (StatusCode, BasicResponse) {
    let response = client()
        .post(format!("http://{addr}/healthcheck/{kind}"))
        .bearer_auth(TOKEN)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

async fn list(addr: SocketAddr) -> Vec<Value> {
    client()
        .get(format!("http://{addr}/healthcheck"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, _) = spawn_test_api().await;

    let response = client()
        .get(format!("http://{addr}/health"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_auth_required() {
    let (addr, _) = spawn_test_api().await;

    let missing = client()
        .get(format!("http://{addr}/healthcheck"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = client()
        .get(format!("http://{addr}/healthcheck"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_periodic_probe_lifecycle() {
    let (addr, registry) = spawn_test_api().await;

    let probe = json!({
        "name": "db",
        "description": "database",
        "interval": "10s",
        "target": "127.0.0.1",
        "port": 5432
    });

    let (status, body) = post(addr, "tcp", probe.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.message, "Healthcheck successfully added");

    let checks = list(addr).await;
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0]["name"], "db");
    assert_eq!(checks[0]["kind"], "tcp");
    assert_eq!(checks[0]["source"], "api");
    assert_eq!(checks[0]["summary"], "database on 127.0.0.1:5432");

    let (status, body) = post(addr, "tcp", probe).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body.message, "probe db already exists");

    let single = client()
        .get(format!("http://{addr}/healthcheck/db"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(single.status(), StatusCode::OK);

    let deleted = client()
        .delete(format!("http://{addr}/healthcheck/db"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    let body: BasicResponse = deleted.json().await.unwrap();
    assert_eq!(body.message, "Successfully deleted healthcheck db");
    assert!(registry.is_empty().await);

    let again = client()
        .delete(format!("http://{addr}/healthcheck/db"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_json() {
    let (addr, registry) = spawn_test_api().await;

    let (status, body) = post(addr, "dns", json!({"name": 42})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body.message
            .starts_with("Fail to create the dns healthcheck. Invalid JSON:"),
        "{}",
        body.message
    );
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_validation_error() {
    let (addr, registry) = spawn_test_api().await;

    let (status, body) = post(
        addr,
        "dns",
        json!({"name": "resolver", "domain": "example.com", "interval": "1s"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body.message
            .starts_with("invalid configuration for probe resolver:"),
        "{}",
        body.message
    );
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_reserved_name_is_rejected() {
    let (addr, registry) = spawn_test_api().await;

    let (status, body) = post(
        addr,
        "dns",
        json!({"name": "tcp", "domain": "example.com", "interval": "10s"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body.message,
        "invalid configuration for probe tcp: the probe name tcp is reserved"
    );
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_one_off_tcp() {
    let (addr, registry) = spawn_test_api().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (status, body) = post(
        addr,
        "tcp",
        json!({"name": "once", "one_off": true, "target": "127.0.0.1", "port": port}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.message, "One-off healthcheck once successfully executed");
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_one_off_http_failure() {
    let (addr, _) = spawn_test_api().await;
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let (status, body) = post(
        addr,
        "http",
        json!({"name": "web", "one_off": true, "url": mock_server.uri()}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body.message,
        "execution of probe web failed: unexpected status code 503"
    );
}

#[tokio::test]
async fn test_one_off_http_initialization_failure() {
    let (addr, _) = spawn_test_api().await;

    let (status, body) = post(
        addr,
        "http",
        json!({"name": "web", "one_off": true, "url": "no scheme"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body.message.starts_with("failed to initialize probe web:"),
        "{}",
        body.message
    );
}

#[tokio::test]
async fn test_run_registered_probe() {
    let (addr, _) = spawn_test_api().await;
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (status, _) = post(
        addr,
        "http",
        json!({"name": "web", "interval": "1m", "url": mock_server.uri()}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let response = client()
        .post(format!("http://{addr}/healthcheck/web/run"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let missing = client()
        .post(format!("http://{addr}/healthcheck/nothing/run"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_unknown_probe() {
    let (addr, _) = spawn_test_api().await;

    let response = client()
        .get(format!("http://{addr}/healthcheck/unknown"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
