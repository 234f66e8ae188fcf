//! Thread-to-ticket correlation embedded in the thread transcript.
//!
//! The mapping from thread id to ticket id is persisted as a sentinel
//! message inside the thread itself; there is no separate durable table.
//! The message send and fetch paths are eventually consistent with each
//! other, so a lookup may miss a marker that was written moments earlier
//! and must be retried on a fixed schedule before absence is reported.

use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use trestle_discord::{DiscordApiClient, DiscordMessage};

/// Content prefix of the sentinel message recording a thread's ticket id.
pub const TICKET_MARKER_PREFIX: &str = "ZENDESK_TICKET_ID:";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Consistency-wait policy for marker lookups.
pub struct ConsistencyPolicy {
    /// Sleep before the first lookup of a reply event.
    pub pre_resolve_delay_ms: u64,
    /// Lookup attempts before absence is treated as permanent.
    pub resolve_max_attempts: usize,
    /// Fixed spacing between lookup attempts; no exponential backoff.
    pub resolve_retry_delay_ms: u64,
    /// Message window fetched per lookup attempt.
    pub fetch_window: usize,
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self {
            pre_resolve_delay_ms: 1_000,
            resolve_max_attempts: 3,
            resolve_retry_delay_ms: 1_000,
            fetch_window: 100,
        }
    }
}

#[derive(Debug, Error)]
/// Why a marker lookup did not produce a ticket id.
pub enum CorrelationError {
    /// Every fetched window lacked the marker. Only reported once the
    /// bounded retry budget is exhausted; callers must not treat an early
    /// miss as permanent absence.
    #[error("no ticket marker found after {attempts} lookup attempts")]
    NotFound { attempts: usize },
    /// The final lookup attempt failed at the API layer.
    #[error("ticket marker lookup failed: {0}")]
    Api(anyhow::Error),
}

/// Renders the sentinel message content for a ticket id.
pub fn render_ticket_marker(ticket_id: u64) -> String {
    format!("{TICKET_MARKER_PREFIX}{ticket_id}")
}

/// Extracts a ticket id from sentinel message content.
pub fn parse_ticket_marker(content: &str) -> Option<u64> {
    content
        .trim()
        .strip_prefix(TICKET_MARKER_PREFIX)
        .and_then(|rest| rest.trim().parse::<u64>().ok())
}

/// Posts the marker into the thread. Runs directly after ticket creation so
/// the marker is the earliest bot message later lookups scan for.
pub async fn record_ticket_marker(
    discord: &DiscordApiClient,
    thread_id: &str,
    ticket_id: u64,
) -> Result<()> {
    discord
        .post_message(thread_id, &render_ticket_marker(ticket_id))
        .await
        .map(|_| ())
}

/// Scans the thread's recent messages for the marker, retrying per the
/// policy. API failures consume attempts like misses; whichever outcome the
/// final attempt produced decides the error variant.
pub async fn resolve_ticket_id(
    discord: &DiscordApiClient,
    thread_id: &str,
    policy: &ConsistencyPolicy,
) -> Result<u64, CorrelationError> {
    let max_attempts = policy.resolve_max_attempts.max(1);
    let mut last_api_error = None;
    for attempt in 1..=max_attempts {
        match discord
            .fetch_thread_messages(thread_id, policy.fetch_window)
            .await
        {
            Ok(messages) => {
                if let Some(ticket_id) = find_marker(&messages) {
                    return Ok(ticket_id);
                }
                last_api_error = None;
            }
            Err(error) => {
                last_api_error = Some(error);
            }
        }
        if attempt < max_attempts && policy.resolve_retry_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(policy.resolve_retry_delay_ms)).await;
        }
    }
    match last_api_error {
        Some(error) => Err(CorrelationError::Api(error)),
        None => Err(CorrelationError::NotFound {
            attempts: max_attempts,
        }),
    }
}

fn find_marker(messages: &[DiscordMessage]) -> Option<u64> {
    messages
        .iter()
        .find_map(|message| parse_ticket_marker(&message.content))
}
