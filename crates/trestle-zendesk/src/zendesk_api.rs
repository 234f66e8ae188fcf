//! Thin request/response wrappers over the Zendesk Tickets API.
//!
//! Every non-success response is surfaced to the caller so the bridge
//! handlers can post user-visible failure notices and audit the event.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

#[cfg(test)]
mod tests;

const INITIAL_TICKET_COMMENT: &str = "New Discord Ticket";

/// Builds the REST base URL for a Zendesk subdomain.
pub fn api_base_for_subdomain(subdomain: &str) -> String {
    format!("https://{}.zendesk.com/api/v2", subdomain.trim())
}

#[derive(Debug, Clone, Deserialize)]
/// A ticket as returned by the create/update endpoints.
pub struct ZendeskTicket {
    pub id: u64,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ZendeskTicketEnvelope {
    ticket: ZendeskTicket,
}

#[derive(Clone)]
/// REST client authenticated with the email/token credential pair.
pub struct ZendeskApiClient {
    http: reqwest::Client,
    api_base: String,
    username: String,
    api_token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl ZendeskApiClient {
    pub fn new(
        api_base: String,
        email: String,
        api_token: String,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let trimmed_base = api_base.trim().trim_end_matches('/');
        if trimmed_base.is_empty() {
            bail!("zendesk api base cannot be empty");
        }
        let email = email.trim();
        if email.is_empty() {
            bail!("zendesk email cannot be empty");
        }
        let api_token = api_token.trim().to_string();
        if api_token.is_empty() {
            bail!("zendesk api token cannot be empty");
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create zendesk api client")?;

        Ok(Self {
            http,
            api_base: trimmed_base.to_string(),
            username: format!("{email}/token"),
            api_token,
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    /// Creates a ticket with the given subject and the standard opening
    /// comment. Returns the remote ticket record including its id.
    pub async fn create_ticket(&self, subject: &str) -> Result<ZendeskTicket> {
        let url = format!("{}/tickets.json", self.api_base);
        let payload = json!({
            "ticket": {
                "subject": subject,
                "comment": { "body": INITIAL_TICKET_COMMENT },
            }
        });
        let envelope: ZendeskTicketEnvelope = self
            .request_json("ticket create", || {
                self.http
                    .post(url.as_str())
                    .basic_auth(&self.username, Some(&self.api_token))
                    .json(&payload)
            })
            .await?;
        Ok(envelope.ticket)
    }

    /// Appends a public comment and forces the ticket back to `open` so a
    /// reply on a solved ticket reopens it for the support team.
    pub async fn append_comment(&self, ticket_id: u64, body: &str) -> Result<()> {
        let payload = json!({
            "ticket": {
                "comment": { "body": body },
                "status": "open",
            }
        });
        self.update_ticket(ticket_id, "ticket comment append", &payload)
            .await
    }

    /// Writes the originating thread id into a custom field (correlation
    /// redundancy) and optionally assigns the ticket to a group.
    pub async fn assign_ticket(
        &self,
        ticket_id: u64,
        custom_field_id: u64,
        thread_id: &str,
        group_id: Option<u64>,
    ) -> Result<()> {
        let mut ticket = json!({
            "custom_fields": [
                { "id": custom_field_id, "value": thread_id }
            ]
        });
        if let Some(group_id) = group_id {
            ticket["group_id"] = Value::from(group_id);
        }
        self.update_ticket(ticket_id, "ticket assignment", &json!({ "ticket": ticket }))
            .await
    }

    async fn update_ticket(&self, ticket_id: u64, operation: &str, payload: &Value) -> Result<()> {
        let url = format!("{}/tickets/{ticket_id}.json", self.api_base);
        let _: Value = self
            .request_json(operation, || {
                self.http
                    .put(url.as_str())
                    .basic_auth(&self.username, Some(&self.api_token))
                    .json(payload)
            })
            .await?;
        Ok(())
    }

    async fn request_json<T, F>(&self, operation: &str, builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            match builder().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode zendesk {operation}"));
                    }
                    if attempt < self.retry_max_attempts
                        && is_retryable_zendesk_status(status.as_u16())
                    {
                        sleep_retry_backoff(self.retry_base_delay_ms, attempt).await;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    bail!(
                        "zendesk {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts
                        && (error.is_timeout() || error.is_connect() || error.is_request())
                    {
                        sleep_retry_backoff(self.retry_base_delay_ms, attempt).await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("zendesk {operation} request failed"));
                }
            }
        }
    }
}

fn is_retryable_zendesk_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}

async fn sleep_retry_backoff(retry_base_delay_ms: u64, attempt: usize) {
    let delay_ms = retry_base_delay_ms.saturating_mul(u64::try_from(attempt).unwrap_or(1));
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}
