//! Client tests against a scripted HTTP server.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rrf_api::{ClientError, DeviceClient, StatusKind};

async fn mock_auth_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rr_connect"))
        .and(query_param("password", "passw0rd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "err": 0,
            "sessionTimeout": 8000,
            "boardType": "duetwifi102"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetch_config_authenticates_lazily_once() {
    let server = MockServer::start().await;
    mock_auth_ok(&server).await;

    Mock::given(method("GET"))
        .and(path("/rr_config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "firmwareName": "RepRapFirmware",
            "firmwareVersion": "2.05.1"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let mut client = DeviceClient::new(server.address().to_string(), "passw0rd");

    let config = client.fetch_config().await.expect("first fetch");
    assert_eq!(config.firmware_version, "2.05.1");

    // second fetch reuses the session; the connect expectation is 1
    client.fetch_config().await.expect("second fetch");
}

#[tokio::test]
async fn rejected_password_surfaces_device_error_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rr_connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"err": 1})))
        .mount(&server)
        .await;

    let mut client = DeviceClient::new(server.address().to_string(), "wrong");
    let err = client
        .fetch_status(StatusKind::Extended)
        .await
        .expect_err("auth should fail");

    match err {
        ClientError::Auth { code, .. } => assert_eq!(code, 1),
        other => panic!("expected auth error, got {other}"),
    }
}

#[tokio::test]
async fn unauthorized_status_is_a_transport_error() {
    let server = MockServer::start().await;
    mock_auth_ok(&server).await;

    Mock::given(method("GET"))
        .and(path("/rr_status"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut client = DeviceClient::new(server.address().to_string(), "passw0rd");
    let err = client
        .fetch_status(StatusKind::Extended)
        .await
        .expect_err("401 should fail the fetch");

    assert!(matches!(err, ClientError::Transport { step: "status", .. }));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    mock_auth_ok(&server).await;

    Mock::given(method("GET"))
        .and(path("/rr_status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let mut client = DeviceClient::new(server.address().to_string(), "passw0rd");
    let err = client
        .fetch_status(StatusKind::Print)
        .await
        .expect_err("garbage body should fail decode");

    assert!(matches!(err, ClientError::Decode { step: "status", .. }));
}
