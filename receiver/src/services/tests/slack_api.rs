//! Chat client tests against a wiremock server

use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::error::ReceiverError;
use crate::services::slack_api::message_body;
use crate::services::RealChatClient;
use crate::traits::ChatClient;

async fn client(server: &MockServer) -> RealChatClient {
    RealChatClient::new("xoxb-test").unwrap().with_base_url(server.uri())
}

#[tokio::test]
async fn test_post_message_sends_channel_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    client
        .post_message("C1", json!({"text": "List of Processes", "blocks": []}))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["channel"], "C1");
    assert_eq!(body["text"], "List of Processes");
}

#[tokio::test]
async fn test_api_level_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "channel_not_found"})))
        .mount(&server)
        .await;

    let client = client(&server).await;
    match client.post_message("C404", json!("hello")).await {
        Err(ReceiverError::ChatApiError { method, message }) => {
            assert_eq!(method, "chat.postMessage");
            assert_eq!(message, "channel_not_found");
        }
        other => panic!("expected ChatApiError, got {other:?}"),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[tokio::test]
async fn test_upload_file_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files.upload"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"channels\""))
        .and(body_string_contains("filename=\"app.log\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    client
        .upload_file("C1", "app.log", "app.log", b"line one\nline two\n".to_vec())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_binary_log_upload_is_byte_exact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files.upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let gzip = vec![0x1f, 0x8b, 0x08, 0x00, 0xff, 0xfe];
    let client = client(&server).await;
    client
        .upload_file("C1", "app-out.log.gz", "app-out.log.gz", gzip.clone())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body = &requests[0].body;
    assert!(contains(body, &gzip), "file bytes arrive unchanged");
    assert!(!contains(body, "\u{FFFD}".as_bytes()));
}

#[test]
fn test_message_body_wraps_text() {
    assert_eq!(message_body("C1", json!("hi")), json!({"text": "hi", "channel": "C1"}));
    assert_eq!(
        message_body("C1", json!({"blocks": []})),
        json!({"blocks": [], "channel": "C1"})
    );
}
