// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Relay behaviour against a simulated HTTP sink.

use assert_json_diff::assert_json_eq;
use rankrelay::protocol::{MALFORMED_MESSAGE, PARAMETER_ERROR, SINK_UNREACHABLE};
use rankrelay::{HttpSink, Relay, RelayResult};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn relay_for(server: &MockServer) -> Relay {
    Relay::new(HttpSink::new(&server.uri(), None).unwrap())
}

fn upload_line(endpoint: &str, rows: serde_json::Value) -> String {
    json!({"type": "xhs-upload", "endpoint": endpoint, "rows": rows, "id": "t-1"}).to_string()
}

#[tokio::test]
async fn success_body_is_forwarded_verbatim() {
    let server = MockServer::start().await;
    let body = json!({"ok": true, "uploaded": 7});
    Mock::given(method("POST"))
        .and(path("/upload_note_rank"))
        .and(body_json(json!({"rows": [{"title": "A"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let result = relay_for(&server)
        .handle_line(&upload_line("upload_note_rank", json!([{"title": "A"}])))
        .await;

    assert_json_eq!(serde_json::to_value(&result).unwrap(), body);
}

#[tokio::test]
async fn extra_body_fields_survive() {
    let server = MockServer::start().await;
    let body = json!({"ok": true, "inserted": 3, "table": "note_rank", "skipped": 0});
    Mock::given(method("POST"))
        .and(path("/db_only_note_rank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let result = relay_for(&server)
        .handle_line(&upload_line("db_only_note_rank", json!([{}, {}, {}])))
        .await;

    assert_eq!(result.inserted(), Some(&json!(3)));
    assert_json_eq!(serde_json::to_value(&result).unwrap(), body);
}

#[tokio::test]
async fn loosely_typed_success_body_is_forwarded_verbatim() {
    let server = MockServer::start().await;
    let body = json!({"ok": true, "uploaded": 7.0, "inserted": "3", "error": null});
    Mock::given(method("POST"))
        .and(path("/upload_account_rank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let result = relay_for(&server)
        .handle_line(&upload_line("upload_account_rank", json!([{}])))
        .await;

    assert!(result.is_success());
    assert_json_eq!(serde_json::to_value(&result).unwrap(), body);
}

#[tokio::test]
async fn ok_other_than_true_is_not_success() {
    let server = MockServer::start().await;
    let body = json!({"ok": 1, "uploaded": 1});
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let result = relay_for(&server)
        .handle_line(&upload_line("upload_note_rank", json!([{}])))
        .await;

    assert!(!result.is_success());
    assert_json_eq!(serde_json::to_value(&result).unwrap(), body);
}

#[tokio::test]
async fn server_error_with_unparsable_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let result = relay_for(&server)
        .handle_line(&upload_line("upload_account_rank", json!([{}])))
        .await;

    assert_eq!(result, RelayResult::failure("local service returned HTTP 500"));
}

#[tokio::test]
async fn server_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(502).set_body_json(json!({"ok": false, "error": "table locked"})),
        )
        .mount(&server)
        .await;

    let result = relay_for(&server)
        .handle_line(&upload_line("upload_note_rank", json!([{}])))
        .await;

    assert_eq!(result, RelayResult::failure("table locked"));
}

#[tokio::test]
async fn success_status_with_non_object_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
        .mount(&server)
        .await;

    let result = relay_for(&server)
        .handle_line(&upload_line("upload_note_rank", json!([{}])))
        .await;

    assert_eq!(result, RelayResult::failure("local service returned HTTP 200"));
}

#[tokio::test]
async fn application_failure_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "error": "feishu token expired"})),
        )
        .mount(&server)
        .await;

    let result = relay_for(&server)
        .handle_line(&upload_line("upload_note_rank", json!([{}])))
        .await;

    assert!(!result.is_success());
    assert_eq!(result.error(), Some("feishu token expired"));
}

#[tokio::test]
async fn invalid_requests_never_reach_the_sink() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(0)
        .mount(&server)
        .await;
    let relay = relay_for(&server);

    let missing_endpoint = json!({"type": "xhs-upload", "rows": []}).to_string();
    assert_eq!(
        relay.handle_line(&missing_endpoint).await,
        RelayResult::failure(PARAMETER_ERROR)
    );

    let rows_not_array =
        json!({"type": "xhs-upload", "endpoint": "upload_note_rank", "rows": "x"}).to_string();
    assert_eq!(
        relay.handle_line(&rows_not_array).await,
        RelayResult::failure(PARAMETER_ERROR)
    );

    assert_eq!(
        relay.handle_line("{not json").await,
        RelayResult::failure(MALFORMED_MESSAGE)
    );
}

#[tokio::test]
async fn unreachable_sink_is_an_answer_not_a_panic() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let relay = Relay::new(HttpSink::new(&format!("http://127.0.0.1:{port}"), None).unwrap());
    let result = relay
        .handle_line(&upload_line("upload_note_rank", json!([{}])))
        .await;

    assert_eq!(result, RelayResult::failure(SINK_UNREACHABLE));
}
