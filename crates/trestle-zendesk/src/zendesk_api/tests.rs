//! Tests for the Zendesk Tickets API wrappers.

use httpmock::prelude::*;
use serde_json::json;

use super::{api_base_for_subdomain, is_retryable_zendesk_status, ZendeskApiClient};

fn test_client(base_url: &str) -> ZendeskApiClient {
    ZendeskApiClient::new(
        base_url.to_string(),
        "support@example.com".to_string(),
        "zd-token".to_string(),
        3_000,
        3,
        1,
    )
    .expect("client")
}

#[test]
fn unit_api_base_for_subdomain_builds_rest_url() {
    assert_eq!(
        api_base_for_subdomain(" acme "),
        "https://acme.zendesk.com/api/v2"
    );
}

#[test]
fn unit_retryable_status_covers_rate_limit_and_server_errors() {
    assert!(is_retryable_zendesk_status(429));
    assert!(is_retryable_zendesk_status(500));
    assert!(!is_retryable_zendesk_status(401));
    assert!(!is_retryable_zendesk_status(422));
}

#[tokio::test]
async fn functional_create_ticket_posts_subject_and_opening_comment() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/tickets.json")
            .header_exists("authorization")
            .json_body(json!({
                "ticket": {
                    "subject": "Help: login broken",
                    "comment": { "body": "New Discord Ticket" }
                }
            }));
        then.status(201).body(
            json!({
                "ticket": { "id": 555, "subject": "Help: login broken", "status": "new" }
            })
            .to_string(),
        );
    });

    let client = test_client(&server.base_url());
    let ticket = client
        .create_ticket("Help: login broken")
        .await
        .expect("create");
    assert_eq!(ticket.id, 555);
    assert_eq!(ticket.status.as_deref(), Some("new"));
    mock.assert();
}

#[tokio::test]
async fn functional_append_comment_forces_status_open() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/tickets/555.json")
            .header_exists("authorization")
            .json_body(json!({
                "ticket": {
                    "comment": { "body": "still broken\n\n*Message from Discord*" },
                    "status": "open"
                }
            }));
        then.status(200)
            .body(json!({"ticket": {"id": 555, "status": "open"}}).to_string());
    });

    let client = test_client(&server.base_url());
    client
        .append_comment(555, "still broken\n\n*Message from Discord*")
        .await
        .expect("append");
    mock.assert();
}

#[tokio::test]
async fn functional_assign_ticket_writes_custom_field_and_group() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT).path("/tickets/555.json").json_body(json!({
            "ticket": {
                "custom_fields": [ { "id": 30319722169997u64, "value": "thread-1" } ],
                "group_id": 31036620834573u64
            }
        }));
        then.status(200)
            .body(json!({"ticket": {"id": 555}}).to_string());
    });

    let client = test_client(&server.base_url());
    client
        .assign_ticket(555, 30319722169997, "thread-1", Some(31036620834573))
        .await
        .expect("assign");
    mock.assert();
}

#[tokio::test]
async fn functional_assign_ticket_omits_group_when_not_configured() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT).path("/tickets/7.json").json_body(json!({
            "ticket": {
                "custom_fields": [ { "id": 42u64, "value": "thread-9" } ]
            }
        }));
        then.status(200).body(json!({"ticket": {"id": 7}}).to_string());
    });

    let client = test_client(&server.base_url());
    client
        .assign_ticket(7, 42, "thread-9", None)
        .await
        .expect("assign");
    mock.assert();
}

#[tokio::test]
async fn regression_non_success_status_is_surfaced_not_swallowed() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/tickets.json");
        then.status(422)
            .body(json!({"error": "RecordInvalid"}).to_string());
    });

    let client = test_client(&server.base_url());
    let error = client
        .create_ticket("broken subject")
        .await
        .expect_err("should surface failure");
    assert!(error.to_string().contains("status 422"));
    mock.assert_calls(1);
}

#[tokio::test]
async fn regression_server_errors_exhaust_bounded_retries() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT).path("/tickets/555.json");
        then.status(503).body("maintenance");
    });

    let client = test_client(&server.base_url());
    let error = client
        .append_comment(555, "hello")
        .await
        .expect_err("should exhaust retries");
    assert!(error.to_string().contains("status 503"));
    mock.assert_calls(3);
}
