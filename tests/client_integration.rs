//! Pipeline and classification behavior over the wire

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use vendora_client::{
    ApiClient, ApiConfig, ApiError, ApiRequest, CredentialStore, ErrorKind, ListEnvelope,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> (ApiClient, Arc<CredentialStore>) {
    let store = Arc::new(CredentialStore::in_memory());
    let client = ApiClient::builder()
        .config(ApiConfig::new(server.uri()).unwrap())
        .credentials(store.clone())
        .build()
        .unwrap();
    (client, store)
}

#[tokio::test]
async fn attaches_bearer_and_json_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("Authorization", "Bearer abc123"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_for(&server);
    store.set(" \"abc123\" ").await.unwrap();

    let result: Value = client.get("/products").await.unwrap();
    assert_eq!(result, json!([]));
}

#[tokio::test]
async fn omits_authorization_header_when_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server);
    client.get::<Value>("/public").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("Authorization").is_none());
}

#[tokio::test]
async fn post_sends_captured_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/products"))
        .and(body_json(json!({"name": "Widget", "price": 10})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"success": true, "data": {"id": 1}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server);
    let response: Value =
        client.post("/products", &json!({"name": "Widget", "price": 10})).await.unwrap();

    assert_eq!(response["data"]["id"], 1);
}

#[tokio::test]
async fn validation_errors_join_the_errors_array() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"errors": ["a", "b"]})))
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server);
    let result: Result<Value, ApiError> = client.post("/products", &json!({})).await;

    assert_eq!(result, Err(ApiError::Validation("a, b".to_string())));
}

#[tokio::test]
async fn duplicate_key_message_reads_as_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"message": "E11000 duplicate key error"})),
        )
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server);
    let result: Result<Value, ApiError> = client.post("/users", &json!({})).await;

    assert_eq!(
        result,
        Err(ApiError::Validation("A record with these details already exists.".to_string()))
    );
}

#[tokio::test]
async fn error_statuses_classify_through_the_taxonomy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server);

    assert_eq!(client.get::<Value>("/missing").await, Err(ApiError::NotFound));
    assert_eq!(client.get::<Value>("/forbidden").await, Err(ApiError::Forbidden));
    assert_eq!(client.get::<Value>("/broken").await, Err(ApiError::ServiceUnavailable));
}

#[tokio::test]
async fn no_content_deserializes_to_unit() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/products/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server);
    client.delete::<()>("/products/1").await.unwrap();
}

#[tokio::test]
async fn transport_failure_surfaces_as_network_error() {
    // Bind and drop a listener so the port refuses connections.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = Arc::new(CredentialStore::in_memory());
    let client = ApiClient::builder()
        .config(ApiConfig::new(format!("http://{addr}")).unwrap())
        .credentials(store)
        .build()
        .unwrap();

    let result = client.get::<Value>("/anything").await;
    match result {
        Err(err) => assert_eq!(err.kind(), ErrorKind::Network),
        Ok(_) => panic!("expected a network error"),
    }
}

#[tokio::test]
async fn slow_responses_hit_the_uniform_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let store = Arc::new(CredentialStore::in_memory());
    let client = ApiClient::builder()
        .config(ApiConfig::new(server.uri()).unwrap().with_timeout(Duration::from_millis(100)))
        .credentials(store)
        .build()
        .unwrap();

    let result = client.get::<Value>("/slow").await;
    assert!(matches!(result, Err(ApiError::Network(_))));
}

#[tokio::test]
async fn typed_list_accepts_both_envelope_shapes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sales"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": [{"id": 1}, {"id": 2}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sales-legacy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 3}])))
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server);

    let wrapped: ListEnvelope<Value> = client.get("/sales").await.unwrap();
    assert_eq!(wrapped.into_items().unwrap().len(), 2);

    let legacy: ListEnvelope<Value> = client.get("/sales-legacy").await.unwrap();
    assert_eq!(legacy.into_items().unwrap().len(), 1);
}

#[tokio::test]
async fn verify_session_reports_valid_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/verify-token"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let (client, store) = client_for(&server);
    store.set("abc").await.unwrap();

    assert!(client.verify_session().await.unwrap());
    assert_eq!(store.get().await, Some("abc".to_string()));
}

#[tokio::test]
async fn verify_session_clears_rejected_credential_without_refreshing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/verify-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (client, store) = client_for(&server);
    store.set("expired").await.unwrap();

    assert!(!client.verify_session().await.unwrap());
    assert_eq!(store.get().await, None);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/auth/refresh-token"));
}

#[tokio::test]
async fn execute_returns_success_responses_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let (client, _store) = client_for(&server);
    let response = client.execute(ApiRequest::get("/raw")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "not json at all");
}
