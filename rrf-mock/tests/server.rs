//! Endpoint tests over loopback HTTP.

use std::collections::HashSet;

use rrf_mock::MockRrf;
use serde_json::Value;

async fn spawn(mock: MockRrf) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(mock.serve(listener));
    format!("http://{addr}")
}

#[tokio::test]
async fn connect_checks_the_password() {
    let base = spawn(MockRrf::new()).await;

    let body: Value = reqwest::get(format!("{base}/rr_connect?password=nope"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["err"], 1);

    let body: Value = reqwest::get(format!("{base}/rr_connect?password=passw0rd"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["err"], 0);
    assert_eq!(body["boardType"], "mockrrf");
}

#[tokio::test]
async fn gated_endpoints_return_401_before_connect() {
    let base = spawn(MockRrf::new()).await;

    for endpoint in ["rr_config", "rr_status?type=2", "rr_gcode", "rr_fileinfo"] {
        let resp = reqwest::get(format!("{base}/{endpoint}"))
            .await
            .expect("request");
        assert_eq!(resp.status(), 401, "{endpoint} should be gated");
    }
}

#[tokio::test]
async fn invalid_status_type_is_coerced_to_one() {
    let base = spawn(MockRrf::new()).await;
    reqwest::get(format!("{base}/rr_connect?password=reprap"))
        .await
        .expect("connect");

    let body: Value = reqwest::get(format!("{base}/rr_status?type=banana"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");

    // a type 1 response has no extended board properties
    assert_eq!(body["status"], "P");
    assert_eq!(body["name"], "");
}

#[tokio::test]
async fn status_counter_advances_per_request() {
    let base = spawn(MockRrf::new()).await;
    reqwest::get(format!("{base}/rr_connect?password=passw0rd"))
        .await
        .expect("connect");

    let first: Value = reqwest::get(format!("{base}/rr_status?type=2"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    let second: Value = reqwest::get(format!("{base}/rr_status?type=2"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");

    assert_eq!(first["time"], 0.0);
    assert_eq!(second["time"], 1.0);
}

#[tokio::test]
async fn scripted_failures_hit_by_request_index() {
    let mock = MockRrf::new().with_fail_set(HashSet::from([0]));
    let base = spawn(mock).await;

    // request 0 fails regardless of endpoint
    let resp = reqwest::get(format!("{base}/rr_connect?password=passw0rd"))
        .await
        .expect("request");
    assert_eq!(resp.status(), 401);

    // request 1 goes through
    let body: Value = reqwest::get(format!("{base}/rr_connect?password=passw0rd"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["err"], 0);
}
