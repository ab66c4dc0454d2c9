#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use bytes::Bytes;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use std::time::Duration;

use enbp_api::{ApiClient, Error, TlsMode, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

const TOKEN: &str = "test-token";

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let token: SecretString = TOKEN.to_owned().into();
    let client = ApiClient::new(&server.uri(), &token, &TransportConfig::default()).unwrap();
    (server, client)
}

// ── Base URL handling ───────────────────────────────────────────────

#[tokio::test]
async fn test_base_path_is_preserved() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v3/site"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "site": { "id": "s1", "name": "Lab" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token: SecretString = TOKEN.to_owned().into();
    let client = ApiClient::new(
        &format!("{}/api", server.uri()),
        &token,
        &TransportConfig::default(),
    )
    .unwrap();

    let site = client.get_gateway_site().await.unwrap();
    assert_eq!(site.id, "s1");
    assert_eq!(site.name, "Lab");
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let token: SecretString = TOKEN.to_owned().into();
    let result = ApiClient::new("not a url", &token, &TransportConfig::default());
    assert!(matches!(result, Err(Error::InvalidUrl(_))));
}

// ── Sites ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_sites_sends_token_and_name_filter() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/sites"))
        .and(query_param("name", "plant"))
        .and(header("X-Enapter-Auth-Token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sites": [
                { "id": "a", "name": "Plant A" },
                { "id": "b", "name": "Plant B" }
            ]
        })))
        .mount(&server)
        .await;

    let sites = client.list_sites(Some("plant")).await.unwrap();
    let ids: Vec<_> = sites.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_get_site_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/sites/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{ "message": "site not found" }]
        })))
        .mount(&server)
        .await;

    let err = client.get_site("missing").await.unwrap_err();
    assert!(err.is_not_found(), "expected not found, got: {err:?}");
}

#[tokio::test]
async fn test_unauthorized_maps_to_typed_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/site"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.get_gateway_site().await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_server_error_counts_as_unreachable() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/site"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client.get_gateway_site().await.unwrap_err();
    match &err {
        Error::Api { status, message } => {
            assert_eq!(*status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
    assert!(err.is_unreachable());
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    let token: SecretString = TOKEN.to_owned().into();
    let client =
        ApiClient::new("http://127.0.0.1:1", &token, &TransportConfig::default()).unwrap();
    let err = client.check_connection().await.unwrap_err();
    assert!(err.is_unreachable(), "expected unreachable, got: {err:?}");
}

#[tokio::test]
async fn test_transport_timeout_applies_to_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/site"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let token: SecretString = TOKEN.to_owned().into();
    let transport = TransportConfig {
        timeout: Duration::from_millis(50),
        ..TransportConfig::default()
    };
    let client = ApiClient::new(&server.uri(), &token, &transport).unwrap();
    let err = client.get_gateway_site().await.unwrap_err();
    assert!(err.is_unreachable(), "expected timeout, got: {err:?}");
}

#[test]
fn test_missing_ca_file_is_tls_error() {
    let token: SecretString = TOKEN.to_owned().into();
    let transport = TransportConfig {
        tls: TlsMode::CustomCa("/nonexistent/ca.pem".into()),
        ..TransportConfig::default()
    };
    let err = ApiClient::new("http://127.0.0.1:1", &token, &transport).unwrap_err();
    assert!(matches!(err, Error::Tls(_)), "got: {err:?}");
}

// ── Devices ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_site_devices_expands_connectivity() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/sites/s1/devices"))
        .and(query_param("expand", "connectivity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "devices": [
                {
                    "id": "d1",
                    "name": "Electrolyser",
                    "site_id": "s1",
                    "type": "lua",
                    "connectivity": { "status": "online" },
                    "firmware": "1.2.3"
                },
                {
                    "id": "d2",
                    "name": "Sensor",
                    "connectivity_status": "offline"
                }
            ]
        })))
        .mount(&server)
        .await;

    let devices = client.list_site_devices("s1").await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].status(), Some("online"));
    assert_eq!(devices[0].device_type.as_deref(), Some("lua"));
    assert_eq!(devices[0].extra.get("firmware"), Some(&json!("1.2.3")));
    assert_eq!(devices[1].status(), Some("offline"));
}

#[tokio::test]
async fn test_list_site_devices_without_array_is_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/sites/s1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let devices = client.list_site_devices("s1").await.unwrap();
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_get_device_bad_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/devices/d1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client.get_device("d1").await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { ref body, .. } if body == "<html>"));
}

// ── Blueprints ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_blueprint_posts_zip() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v3/blueprints/upload"))
        .and(header("content-type", "application/zip"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "blueprint": { "id": "bp-42" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = client
        .upload_blueprint(Bytes::from_static(b"PK\x05\x06"))
        .await
        .unwrap();
    assert_eq!(id, "bp-42");
}

#[tokio::test]
async fn test_assign_blueprint_sends_id() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v3/devices/d1/assign_blueprint"))
        .and(body_json(json!({ "blueprint_id": "bp-42" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client.assign_blueprint("d1", "bp-42").await.unwrap();
}

#[tokio::test]
async fn test_forbidden_carries_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v3/devices/d1/assign_blueprint"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errors": [{ "message": "read-only role" }]
        })))
        .mount(&server)
        .await;

    let err = client.assign_blueprint("d1", "bp").await.unwrap_err();
    assert!(matches!(err, Error::Forbidden { ref message } if message == "read-only role"));
}
