use aries_perf_bot::webhooks::{NotificationProcessor, WebhookServer};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn start_server(processor: Arc<NotificationProcessor>) -> String {
    let bound = WebhookServer::new(0, processor).bind().await.unwrap();
    let addr = bound.local_addr();
    tokio::spawn(bound.serve());
    format!("http://127.0.0.1:{}", addr.port())
}

#[tokio::test]
async fn posted_notifications_reach_the_state_store() {
    let processor = Arc::new(NotificationProcessor::new("holder"));
    let base = start_server(processor.clone()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/topic/issue_credential_v2_0", base))
        .json(&json!({ "cred_ex_id": "cred-1", "state": "done" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // Agents post with a trailing slash as well.
    let response = client
        .post(format!("{}/topic/issue_credential_v2_0/", base))
        .json(&json!({ "cred_ex_id": "cred-2", "state": "offer_sent" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(processor.credentials.len(), 2);
    let stats = processor.stats().await;
    assert_eq!(stats.credential_events, 2);
}

#[tokio::test]
async fn malformed_payloads_are_acked_and_skipped() {
    let processor = Arc::new(NotificationProcessor::new("holder"));
    let base = start_server(processor.clone()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/topic/issue_credential_v2_0", base))
        .json(&json!({ "unexpected": "shape" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(processor.credentials.is_empty());
    assert_eq!(processor.stats().await.skipped_malformed, 1);
}

#[tokio::test]
async fn health_endpoint_responds() {
    let processor = Arc::new(NotificationProcessor::new("issuer"));
    let base = start_server(processor).await;
    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}
