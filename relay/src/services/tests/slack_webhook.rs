//! Webhook sink tests against a wiremock server

use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared::EventKind;

use super::{test_destination, test_message};
use crate::error::RelayError;
use crate::services::RealSlackWebhook;
use crate::traits::NotificationSink;

#[tokio::test]
async fn test_batch_is_posted_as_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let sink = RealSlackWebhook::new().unwrap();
    let destination = test_destination(format!("{}/hook", server.uri()));
    let batch = vec![
        test_message("api", EventKind::Error, "first"),
        test_message("api", EventKind::Error, "second"),
        test_message("api", EventKind::Log, "third"),
    ];

    sink.deliver(&destination, &batch).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let texts: Vec<&str> = body["attachments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
    assert_eq!(body["username"], "PM2");
    assert_eq!(body["attachments"][0]["footer"], "test-host");
}

#[tokio::test]
async fn test_rejected_delivery_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no_service"))
        .mount(&server)
        .await;

    let sink = RealSlackWebhook::new().unwrap();
    let destination = test_destination(format!("{}/hook", server.uri()));
    let result = sink
        .deliver(&destination, &[test_message("api", EventKind::Stop, "App stopped.")])
        .await;

    match result {
        Err(RelayError::DeliveryRejected { status, body, .. }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "no_service");
        }
        other => panic!("expected DeliveryRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_destination_fails() {
    let sink = RealSlackWebhook::new().unwrap();
    let destination = test_destination("http://127.0.0.1:9/hook".to_string());
    let result = sink
        .deliver(&destination, &[test_message("api", EventKind::Stop, "App stopped.")])
        .await;
    assert!(matches!(result, Err(RelayError::DeliveryFailed { .. })));
}
