use httpmock::prelude::*;
use serde_json::json;
use wind_core::config::WindBridgeConfig;
use windpy::{WindApi, WindBridgeClient, WindCall, WindError};

fn client_for(server: &MockServer, token: Option<&str>) -> WindBridgeClient {
    let bridge = WindBridgeConfig {
        endpoint: server.base_url(),
        token: token.map(str::to_string),
        timeout_secs: 5,
        start_wait_secs: 1,
    };
    WindBridgeClient::new(&bridge).unwrap()
}

#[tokio::test]
async fn wsd_call_posts_named_arguments() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/call").json_body(json!({
                "function": "wsd",
                "codes": "600030.SH",
                "fields": "close",
                "beginTime": "20240102",
                "endTime": "20240104",
                "options": ""
            }));
            then.status(200).json_body(json!({
                "ErrorCode": 0,
                "Codes": ["600030.SH"],
                "Fields": ["CLOSE"],
                "Times": ["2024-01-02", "2024-01-03", "2024-01-04"],
                "Data": [[20.1, 20.4, 19.9]]
            }));
        })
        .await;

    let client = client_for(&server, None);
    let call = WindCall::Wsd {
        codes: "600030.SH".into(),
        fields: "close".into(),
        begin_time: "20240102".into(),
        end_time: "20240104".into(),
        options: String::new(),
    };
    let data = client.call(&call).await.unwrap();

    mock.assert_async().await;
    assert!(data.is_success());
    assert_eq!(data.times.len(), 3);
    assert_eq!(data.first_column().len(), 3);
}

#[tokio::test]
async fn token_is_sent_as_bearer() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/isconnected")
                .header("authorization", "Bearer s3cret");
            then.status(200).json_body(json!({ "connected": true }));
        })
        .await;

    let client = client_for(&server, Some("s3cret"));
    assert!(client.is_connected().await.unwrap());
    mock.assert_async().await;
}

#[tokio::test]
async fn start_sends_wait_time() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/start")
                .json_body(json!({ "waitTime": 1 }));
            then.status(200)
                .json_body(json!({ "ErrorCode": 0, "Data": [["OK!"]] }));
        })
        .await;

    let client = client_for(&server, None);
    let data = client.start().await.unwrap();
    mock.assert_async().await;
    assert!(data.is_success());
}

#[tokio::test]
async fn non_success_status_keeps_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/stop");
            then.status(502).body("terminal offline");
        })
        .await;

    let client = client_for(&server, None);
    match client.stop().await {
        Err(WindError::HttpStatus { status, body }) => {
            assert_eq!(status.as_u16(), 502);
            assert_eq!(body, "terminal offline");
        }
        other => panic!("expected http status error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_payload_is_a_deserialize_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/isconnected");
            then.status(200).body("<html>not json</html>");
        })
        .await;

    let client = client_for(&server, None);
    assert!(matches!(
        client.is_connected().await,
        Err(WindError::Deserialize(_))
    ));
}
