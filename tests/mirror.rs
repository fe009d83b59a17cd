//! Mirror client against a local HTTP server with canned responses.

use std::time::Duration;

use ledger_flow::ledger::error::LedgerError;
use ledger_flow::ledger::ids::{Timestamp, TopicId};
use ledger_flow::ledger::network::{MessageFeed, Query, QueryService, Since};
use ledger_flow::mirror::MirrorClient;

mod common;

const MESSAGES_PAGE: &str = r#"{
  "messages": [
    {"topic_id": "0.0.1001", "sequence_number": 1, "consensus_timestamp": "1700000000.000000001", "message": "aGVsbG8="},
    {"topic_id": "0.0.1001", "sequence_number": 2, "consensus_timestamp": "1700000001.5", "message": "d29ybGQ="}
  ],
  "links": {"next": null}
}"#;

fn route(path: &str) -> (u16, String) {
    match path {
        "/api/v1/topics/0.0.1001/messages" => (200, MESSAGES_PAGE.to_string()),
        "/api/v1/topics/0.0.400" => (400, r#"{"_status":{"messages":[{"message":"Invalid parameter"}]}}"#.to_string()),
        "/api/v1/topics/0.0.429" => (429, "{}".to_string()),
        "/api/v1/topics/0.0.503" => (503, "{}".to_string()),
        _ => (404, r#"{"_status":{"messages":[{"message":"Not found"}]}}"#.to_string()),
    }
}

async fn mirror() -> MirrorClient {
    let addr = common::start_mock_mirror(route).await;
    MirrorClient::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap()
}

async fn topic_info_error(client: &MirrorClient, num: u64) -> LedgerError {
    client
        .query(&Query::TopicInfo(TopicId::new(0, 0, num)))
        .await
        .unwrap_err()
}

#[tokio::test]
async fn test_status_codes_map_to_error_kinds() {
    let client = mirror().await;

    let not_found = topic_info_error(&client, 404).await;
    assert!(matches!(not_found, LedgerError::Query(_)));
    assert!(!not_found.is_retryable());

    let throttled = topic_info_error(&client, 429).await;
    assert!(matches!(throttled, LedgerError::Network(_)));
    assert!(throttled.is_retryable());

    let unavailable = topic_info_error(&client, 503).await;
    assert!(matches!(unavailable, LedgerError::Network(_)));
    assert!(unavailable.is_retryable());

    let bad_request = topic_info_error(&client, 400).await;
    assert!(matches!(bad_request, LedgerError::Query(_)));
    assert!(!bad_request.is_retryable());
}

#[tokio::test]
async fn test_message_page_is_decoded_in_order() {
    let client = mirror().await;
    let topic_id = TopicId::new(0, 0, 1001);

    let messages = client
        .messages(topic_id, Since::AtOrAfter(Timestamp::EPOCH), 25)
        .await
        .unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].contents, b"hello");
    assert_eq!(messages[0].consensus_timestamp, Timestamp::new(1_700_000_000, 1));
    assert_eq!(messages[1].sequence_number, 2);
    assert_eq!(messages[1].contents_lossy(), "world");
    assert!(messages.iter().all(|m| m.topic_id == topic_id));
}

#[tokio::test]
async fn test_unknown_topic_feed_reads_as_empty() {
    let client = mirror().await;
    let messages = client
        .messages(TopicId::new(0, 0, 7), Since::After(Timestamp::EPOCH), 10)
        .await
        .unwrap();
    assert!(messages.is_empty());
}
