#![allow(clippy::unwrap_used)]
// Integration tests for `HttpClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use alarmlink_api::{AlarmApi, Error, HttpClient, Session, SystemId};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HttpClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = HttpClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn session() -> Session {
    Session::new(
        SecretString::from("tok-123".to_string()),
        vec![SystemId::new("sys-1")],
    )
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({
            "username": "owner@example.com",
            "password": "hunter2",
            "provider": "alarm.com"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-abc",
            "systems": ["sys-1", "sys-2"]
        })))
        .mount(&server)
        .await;

    let session = client
        .login("owner@example.com", &secret("hunter2"), Some("alarm.com"))
        .await
        .unwrap();

    assert_eq!(session.systems().len(), 2);
    assert_eq!(session.primary_system(), Some(&SystemId::new("sys-1")));
}

#[tokio::test]
async fn test_login_omits_empty_provider() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({
            "username": "owner@example.com",
            "password": "hunter2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-abc",
            "systems": ["sys-1"]
        })))
        .mount(&server)
        .await;

    let session = client
        .login("owner@example.com", &secret("hunter2"), Some(""))
        .await
        .unwrap();
    assert_eq!(session.systems().len(), 1);
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let result = client
        .login("owner@example.com", &secret("wrong"), None)
        .await;

    match result {
        Err(Error::Authentication { ref message }) => {
            assert!(
                message.contains("bad credentials"),
                "expected server body in message, got: {message}"
            );
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_login_without_systems_is_empty_session() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok" })))
        .mount(&server)
        .await;

    let session = client
        .login("owner@example.com", &secret("hunter2"), None)
        .await
        .unwrap();
    assert!(session.primary_system().is_none());
}

// ── State tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_state_sends_bearer_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/systems/sys-1/state"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "partitions": [{
                "id": "part-1",
                "attributes": { "description": "House", "state": 2, "armType": "stay" }
            }]
        })))
        .mount(&server)
        .await;

    let state = client
        .get_state(&SystemId::new("sys-1"), &session())
        .await
        .unwrap();

    let partition = state.first_partition().unwrap();
    assert_eq!(partition.id, "part-1");
    assert_eq!(partition.attributes.state, 2);
}

#[tokio::test]
async fn test_get_state_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client
        .get_state(&SystemId::new("sys-1"), &session())
        .await
        .unwrap_err();

    assert!(err.is_auth_failure(), "expected auth failure, got: {err:?}");
}

#[tokio::test]
async fn test_in_band_error_envelope() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/systems/sys-1/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": 401, "message": "token revoked" }
        })))
        .mount(&server)
        .await;

    let result = client.get_state(&SystemId::new("sys-1"), &session()).await;

    match result {
        Err(Error::Authentication { ref message }) => assert_eq!(message, "token revoked"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_get_state_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/systems/sys-1/state"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = client.get_state(&SystemId::new("sys-1"), &session()).await;

    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Action tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_arm_away_with_pin() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/systems/sys-1/arm-away"))
        .and(header("authorization", "Bearer tok-123"))
        .and(body_json(json!({ "pin": "1234" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .arm_away(&SystemId::new("sys-1"), &session(), Some(&secret("1234")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_disarm_without_pin_sends_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/systems/sys-1/disarm"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .disarm(&SystemId::new("sys-1"), &session(), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_arm_stay_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/systems/sys-1/arm-stay"))
        .respond_with(ResponseTemplate::new(503).set_body_string("panel offline"))
        .mount(&server)
        .await;

    let result = client
        .arm_stay(&SystemId::new("sys-1"), &session(), None)
        .await;

    let err = result.unwrap_err();
    assert!(err.is_transient());
    assert!(!err.is_auth_failure());
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "panel offline");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}
