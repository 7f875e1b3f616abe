//! Integration tests for the API access layer
//!
//! Drives the full client against a wiremock backend, covering the
//! coordination properties the pipeline exists to provide: single-flight
//! refresh, the exactly-once retry bound, overload penalties, and
//! degradation without stored credentials.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tenora_client::{ApiClient, ApiClientConfig, ApiError};
use tenora_common::auth::Credential;
use tenora_common::testing::MemoryCredentialStore;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn refresh_body(access: &str, refresh: &str) -> Value {
    json!({
        "accessToken": access,
        "refreshToken": refresh,
        "expiresIn": 900,
    })
}

fn client_with_store(server: &MockServer, store: MemoryCredentialStore) -> ApiClient {
    ApiClient::builder()
        .config(ApiClientConfig::with_base_url(server.uri()))
        .credential_store(Arc::new(store))
        .build()
        .expect("client should build")
}

fn seeded_store(access: &str, refresh: &str) -> MemoryCredentialStore {
    MemoryCredentialStore::with_credential(Credential::new(
        access.to_string(),
        refresh.to_string(),
        None,
    ))
}

/// Two parallel requests both draw 401 on the old token; the refresh
/// endpoint is called exactly once, both retries carry the new token, and
/// the store sees exactly one save.
#[tokio::test]
async fn concurrent_401s_collapse_into_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .and(header("Authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    // Delay widens the window in which the second 401 observes the
    // refresh as pending.
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refreshToken": "r1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(refresh_body("new", "r2"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .and(header("Authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&server)
        .await;

    let store = seeded_store("old", "r1");
    let client = client_with_store(&server, store.clone());

    let (a, b) = tokio::join!(
        client.get::<Value>("/data", &[], &[]),
        client.get::<Value>("/data", &[], &[]),
    );
    assert!(a.is_ok(), "first request should succeed after refresh: {a:?}");
    assert!(b.is_ok(), "second request should succeed after refresh: {b:?}");

    // Exactly one refresh happened and exactly one save recorded it.
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.saved_access_tokens(), vec!["new".to_string()]);
    assert_eq!(store.stored().unwrap().refresh_token, "r2");
}

/// A 401 on the request that is already the post-refresh retry surfaces
/// `AuthRequired`, clears stored credentials, and does not trigger a
/// second refresh.
#[tokio::test]
async fn post_refresh_401_clears_session_without_second_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body("new", "r2")))
        .expect(1)
        .mount(&server)
        .await;

    let store = seeded_store("old", "r1");
    let client = client_with_store(&server, store.clone());

    let error = client.get::<Value>("/data", &[], &[]).await.unwrap_err();
    assert!(matches!(error, ApiError::AuthRequired(_)));

    assert!(store.stored().is_none(), "credentials must be cleared");
    assert!(store.clear_count() >= 1);
}

/// A failing refresh is irrecoverable: every waiter sees `AuthRequired`
/// and the stored credential is gone.
#[tokio::test]
async fn refresh_failure_logs_the_session_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "invalid refresh token"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = seeded_store("old", "r1");
    let client = client_with_store(&server, store.clone());

    let error = client.get::<Value>("/data", &[], &[]).await.unwrap_err();
    assert!(matches!(error, ApiError::AuthRequired(_)));
    assert!(store.stored().is_none());
    assert_eq!(store.save_count(), 0);
}

/// With nothing in the store, requests dispatch without an
/// `Authorization` header instead of failing client-side.
#[tokio::test]
async fn missing_credential_dispatches_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_store(&server, MemoryCredentialStore::new());
    let result: Value = client.get("/public", &[], &[]).await.unwrap();
    assert_eq!(result["ok"], true);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("Authorization").is_none());
}

/// 429 surfaces as a typed rate-limit error; the server's `Retry-After`
/// wins over the configured cool-down when present.
#[tokio::test]
async fn overload_prefers_server_retry_after_hint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/images"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "7")
                .set_body_json(json!({"message": "slow down"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_store(&server, MemoryCredentialStore::new());
    let error = client.get::<Value>("/uploads/images", &[], &[]).await.unwrap_err();

    assert!(matches!(error, ApiError::RateLimited { .. }));
    assert_eq!(error.retry_after(), Some(Duration::from_secs(7)));
}

/// Without a server hint the error carries the class cool-down, and the
/// penalty is never retried automatically.
#[tokio::test]
async fn overload_falls_back_to_class_cooldown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/images"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_store(&server, MemoryCredentialStore::new());
    let error = client.get::<Value>("/uploads/images", &[], &[]).await.unwrap_err();

    // /uploads is configured with a 10s cool-down by default.
    assert_eq!(error.retry_after(), Some(Duration::from_secs(10)));

    // Exactly one request reached the server: 429 is surfaced, not
    // retried.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

/// Network failures surface as typed errors without any dispatch retry.
#[tokio::test]
async fn transport_failure_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::builder()
        .config(ApiClientConfig::with_base_url(format!("http://{addr}")))
        .credential_store(Arc::new(MemoryCredentialStore::new()))
        .build()
        .unwrap();

    let error = client.get::<Value>("/data", &[], &[]).await.unwrap_err();
    assert!(matches!(error, ApiError::Network(_)));
}

/// After a successful refresh, later requests reuse the new credential
/// without touching the refresh endpoint again.
#[tokio::test]
async fn refreshed_credential_is_reused_afterwards() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .and(header("Authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body("new", "r2")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .and(header("Authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_with_store(&server, seeded_store("old", "r1"));

    // First request refreshes; the next two ride the new credential.
    for _ in 0..3 {
        let result: Value = client.get("/data", &[], &[]).await.unwrap();
        assert_eq!(result["ok"], true);
    }
}
