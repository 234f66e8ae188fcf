//! Inbound event handling for the support-forum-to-ticket bridge.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use trestle_discord::DiscordApiClient;
use trestle_zendesk::ZendeskApiClient;

mod audit_log;
mod correlation;
mod discord_gateway;
mod events;

pub use audit_log::AuditLog;
pub use correlation::{
    parse_ticket_marker, render_ticket_marker, ConsistencyPolicy, CorrelationError,
    TICKET_MARKER_PREFIX,
};
pub use discord_gateway::run_discord_gateway;
pub use events::{MessageCreated, ThreadCreated};

const TICKET_FAILURE_NOTICE: &str =
    "Failed to create or update Zendesk ticket. Please try again later.";
const COMMENT_PROVENANCE_SUFFIX: &str = "*Message from Discord*";

#[derive(Debug, Clone)]
/// Runtime configuration for the bridge event handlers.
pub struct BridgeRuntimeConfig {
    pub support_forum_id: String,
    pub zendesk_thread_field_id: Option<u64>,
    pub zendesk_group_id: Option<u64>,
    pub consistency: ConsistencyPolicy,
}

/// Handles thread-created and message-created events from the chat gateway.
///
/// The two relay directions share no in-process state; everything the
/// handlers need to correlate a thread with its ticket lives in the thread
/// transcript itself (see `correlation`).
pub struct BridgeRuntime {
    config: BridgeRuntimeConfig,
    discord: DiscordApiClient,
    zendesk: ZendeskApiClient,
    audit: AuditLog,
}

impl BridgeRuntime {
    pub fn new(
        config: BridgeRuntimeConfig,
        discord: DiscordApiClient,
        zendesk: ZendeskApiClient,
        audit: AuditLog,
    ) -> Self {
        Self {
            config,
            discord,
            zendesk,
            audit,
        }
    }

    /// Opens a ticket for a new support-forum thread and records the
    /// correlation marker. Threads outside the configured forum are ignored.
    ///
    /// Failure of either step is surfaced loudly: a user-visible notice is
    /// posted into the thread and the event is audited. Creation is not
    /// retried automatically; a human reopens the thread to retry.
    pub async fn handle_thread_created(&self, event: &ThreadCreated) -> Result<()> {
        if event.parent_id != self.config.support_forum_id {
            return Ok(());
        }

        match self.open_ticket_for_thread(event).await {
            Ok(ticket_id) => {
                tracing::info!(
                    thread_id = %event.thread_id,
                    ticket_id,
                    "created ticket for new support thread"
                );
                self.audit.record(
                    "thread_ticket_created",
                    json!({ "thread_id": event.thread_id, "ticket_id": ticket_id }),
                );
                Ok(())
            }
            Err(error) => {
                tracing::error!(
                    thread_id = %event.thread_id,
                    error = %format!("{error:#}"),
                    "failed to open ticket for support thread"
                );
                self.audit.record(
                    "thread_ticket_failed",
                    json!({ "thread_id": event.thread_id, "error": format!("{error:#}") }),
                );
                if let Err(notice_error) = self
                    .discord
                    .post_message(&event.thread_id, TICKET_FAILURE_NOTICE)
                    .await
                {
                    tracing::error!(
                        thread_id = %event.thread_id,
                        error = %format!("{notice_error:#}"),
                        "failed to post ticket failure notice"
                    );
                }
                Err(error)
            }
        }
    }

    async fn open_ticket_for_thread(&self, event: &ThreadCreated) -> Result<u64> {
        let ticket = self
            .zendesk
            .create_ticket(&event.title)
            .await
            .context("ticket creation failed")?;

        // The marker must land before any reply event tries to resolve it,
        // and a silent record failure would orphan the ticket.
        correlation::record_ticket_marker(&self.discord, &event.thread_id, ticket.id)
            .await
            .context("ticket marker record failed")?;

        if let Some(field_id) = self.config.zendesk_thread_field_id {
            self.zendesk
                .assign_ticket(
                    ticket.id,
                    field_id,
                    &event.thread_id,
                    self.config.zendesk_group_id,
                )
                .await
                .context("ticket assignment failed")?;
        }
        Ok(ticket.id)
    }

    /// Relays a human reply in a support thread as a ticket comment.
    ///
    /// Bot-authored messages are ignored so the marker message and relayed
    /// ticket comments never echo back into the loop. Resolution exhaustion
    /// is a terminal drop for the event: audited, never re-queued.
    pub async fn handle_message_created(&self, event: &MessageCreated) -> Result<()> {
        if event.parent_id.as_deref() != Some(self.config.support_forum_id.as_str()) {
            return Ok(());
        }
        if event.author_is_bot {
            return Ok(());
        }

        let policy = &self.config.consistency;
        if policy.pre_resolve_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(policy.pre_resolve_delay_ms)).await;
        }

        let ticket_id =
            match correlation::resolve_ticket_id(&self.discord, &event.thread_id, policy).await {
                Ok(ticket_id) => ticket_id,
                Err(CorrelationError::NotFound { attempts }) => {
                    tracing::warn!(
                        thread_id = %event.thread_id,
                        attempts,
                        "dropped reply: no ticket marker found"
                    );
                    self.audit.record(
                        "ticket_resolve_exhausted",
                        json!({ "thread_id": event.thread_id, "attempts": attempts }),
                    );
                    return Ok(());
                }
                Err(CorrelationError::Api(error)) => {
                    self.audit.record(
                        "ticket_resolve_failed",
                        json!({ "thread_id": event.thread_id, "error": format!("{error:#}") }),
                    );
                    return Err(error.context("ticket marker lookup failed"));
                }
            };

        let comment = format!("{}\n\n{COMMENT_PROVENANCE_SUFFIX}", event.content);
        match self.zendesk.append_comment(ticket_id, &comment).await {
            Ok(()) => {
                tracing::info!(
                    thread_id = %event.thread_id,
                    ticket_id,
                    "relayed thread reply as ticket comment"
                );
                self.audit.record(
                    "ticket_comment_appended",
                    json!({ "thread_id": event.thread_id, "ticket_id": ticket_id }),
                );
                Ok(())
            }
            Err(error) => {
                self.audit.record(
                    "ticket_comment_failed",
                    json!({
                        "thread_id": event.thread_id,
                        "ticket_id": ticket_id,
                        "error": format!("{error:#}"),
                    }),
                );
                Err(error.context("ticket comment append failed"))
            }
        }
    }
}
