//! Tests for the Discord REST client wrappers.

use httpmock::prelude::*;
use serde_json::json;

use super::{is_retryable_discord_status, truncate_for_error, DiscordApiClient};

fn test_client(base_url: &str) -> DiscordApiClient {
    DiscordApiClient::new(base_url.to_string(), "test-token".to_string(), 3_000, 3, 1)
        .expect("client")
}

#[test]
fn unit_retryable_status_covers_rate_limit_and_server_errors() {
    assert!(is_retryable_discord_status(429));
    assert!(is_retryable_discord_status(500));
    assert!(is_retryable_discord_status(503));
    assert!(!is_retryable_discord_status(400));
    assert!(!is_retryable_discord_status(404));
}

#[test]
fn unit_truncate_for_error_bounds_long_bodies() {
    assert_eq!(truncate_for_error("short", 10), "short");
    let truncated = truncate_for_error("0123456789abcdef", 10);
    assert_eq!(truncated, "0123456789...");
}

#[tokio::test]
async fn functional_post_message_sends_bot_authorization() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/channels/thread-1/messages")
            .header("authorization", "Bot test-token")
            .json_body(json!({"content": "hello"}));
        then.status(200).body(
            json!({
                "id": "m1",
                "channel_id": "thread-1",
                "content": "hello",
                "author": {"id": "bot-1", "bot": true}
            })
            .to_string(),
        );
    });

    let client = test_client(&server.base_url());
    let message = client.post_message("thread-1", "hello").await.expect("post");
    assert_eq!(message.id, "m1");
    assert!(message.author.bot);
    mock.assert();
}

#[tokio::test]
async fn functional_fetch_thread_messages_requests_bounded_window() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/channels/thread-1/messages")
            .query_param("limit", "100")
            .header("authorization", "Bot test-token");
        then.status(200).body(
            json!([
                {
                    "id": "m2",
                    "channel_id": "thread-1",
                    "content": "still broken",
                    "author": {"id": "user-1", "bot": false},
                    "timestamp": "2026-08-06T10:00:00Z"
                },
                {
                    "id": "m1",
                    "channel_id": "thread-1",
                    "content": "ZENDESK_TICKET_ID:555",
                    "author": {"id": "bot-1", "bot": true}
                }
            ])
            .to_string(),
        );
    });

    let client = test_client(&server.base_url());
    let messages = client
        .fetch_thread_messages("thread-1", 100)
        .await
        .expect("fetch");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "ZENDESK_TICKET_ID:555");
    mock.assert();
}

#[tokio::test]
async fn functional_fetch_active_threads_unwraps_envelope() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/guilds/guild-1/threads/active")
            .header("authorization", "Bot test-token");
        then.status(200).body(
            json!({
                "threads": [
                    {"id": "T1", "parent_id": "forum-1", "name": "Help: login broken"},
                    {"id": "T2", "parent_id": "other-channel"}
                ]
            })
            .to_string(),
        );
    });

    let client = test_client(&server.base_url());
    let threads = client.fetch_active_threads("guild-1").await.expect("fetch");
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].parent_id.as_deref(), Some("forum-1"));
    mock.assert();
}

#[tokio::test]
async fn functional_execute_webhook_posts_content_with_thread_query() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/webhooks/123/token-abc")
            .query_param("thread_id", "T1")
            .json_body(json!({"content": "We fixed it"}));
        then.status(204);
    });

    let client = test_client(&server.base_url());
    let webhook_url = format!("{}/webhooks/123/token-abc", server.base_url());
    client
        .execute_webhook(&webhook_url, "T1", "We fixed it")
        .await
        .expect("deliver");
    mock.assert();
}

#[tokio::test]
async fn regression_server_errors_exhaust_bounded_retries() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/channels/thread-1/messages");
        then.status(503).body("upstream unavailable");
    });

    let client = test_client(&server.base_url());
    let error = client
        .post_message("thread-1", "hello")
        .await
        .expect_err("should exhaust retries");
    assert!(error.to_string().contains("status 503"));
    mock.assert_calls(3);
}

#[tokio::test]
async fn regression_client_errors_are_not_retried() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/channels/thread-1/messages");
        then.status(403).body(json!({"message": "Missing Access"}).to_string());
    });

    let client = test_client(&server.base_url());
    let error = client
        .post_message("thread-1", "hello")
        .await
        .expect_err("should fail");
    assert!(error.to_string().contains("status 403"));
    mock.assert_calls(1);
}
