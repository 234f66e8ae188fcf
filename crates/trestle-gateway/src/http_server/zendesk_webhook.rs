//! Inbound ticketing webhook relaying comments into Discord threads.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use super::{decode_hex, HttpServerState};

const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature-256";

#[derive(Debug, Deserialize)]
struct ZendeskWebhookPayload {
    #[serde(rename = "threadID")]
    thread_id: String,
    comment_description: String,
    commenter_id: String,
}

pub(super) async fn handle_zendesk_webhook(
    State(state): State<Arc<HttpServerState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(secret) = state.config.webhook_secret.as_deref() {
        let signature = headers
            .get(WEBHOOK_SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .unwrap_or("");
        if verify_sha256_hmac_signature(body.as_bytes(), signature, secret).is_err() {
            tracing::warn!("rejected ticketing webhook with invalid signature");
            state
                .audit
                .record("webhook_rejected", json!({"reason": "invalid_signature"}));
            return (
                StatusCode::UNAUTHORIZED,
                Json(
                    json!({"error":{"code":"invalid_signature","message":"webhook signature verification failed"}}),
                ),
            )
                .into_response();
        }
    }

    let payload = match serde_json::from_str::<ZendeskWebhookPayload>(&body) {
        Ok(payload) => payload,
        Err(error) => {
            state
                .audit
                .record("webhook_rejected", json!({"reason": "parse_failed"}));
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error":{"code":"parse_failed","message":format!("invalid webhook payload: {error}")}})),
            )
                .into_response();
        }
    };
    state.audit.record(
        "webhook_received",
        json!({"thread_id": payload.thread_id, "commenter_id": payload.commenter_id}),
    );

    // Routing is resolved before any chat-platform traffic: an unmapped
    // commenter is a caller error, not a delivery miss.
    let webhook_url = match state.routes.get(payload.commenter_id.trim()) {
        Some(url) => url.clone(),
        None => {
            tracing::warn!(commenter_id = %payload.commenter_id, "no delivery route for commenter");
            state.audit.record(
                "webhook_rejected",
                json!({"reason": "unmapped_commenter", "commenter_id": payload.commenter_id}),
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(
                    json!({"error":{"code":"unmapped_commenter","message":"no delivery route for commenter id"}}),
                ),
            )
                .into_response();
        }
    };

    match relay_comment(&state, &payload, &webhook_url).await {
        Ok(delivered) => (
            StatusCode::OK,
            Json(json!({"status":"processed","delivered":delivered})),
        )
            .into_response(),
        Err(error) => {
            tracing::error!(
                thread_id = %payload.thread_id,
                error = %format!("{error:#}"),
                "ticketing webhook processing failed"
            );
            state.audit.record(
                "webhook_failed",
                json!({"thread_id": payload.thread_id, "error": format!("{error:#}")}),
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error":{"code":"internal_error","message":"webhook processing failed"}})),
            )
                .into_response()
        }
    }
}

/// Scans the forum's active threads for the target and delivers the comment
/// through the mapped webhook URL. An absent thread (archived or already
/// consumed) is a logged success so the remote system does not retry forever.
async fn relay_comment(
    state: &HttpServerState,
    payload: &ZendeskWebhookPayload,
    webhook_url: &str,
) -> Result<bool> {
    let threads = state
        .discord
        .fetch_active_threads(&state.config.guild_id)
        .await
        .context("active thread fetch failed")?;
    let target = threads.iter().find(|thread| {
        thread.parent_id.as_deref() == Some(state.config.support_forum_id.as_str())
            && thread.id == payload.thread_id
    });
    let Some(thread) = target else {
        tracing::info!(thread_id = %payload.thread_id, "no active thread matches webhook payload");
        state.audit.record(
            "webhook_thread_not_found",
            json!({"thread_id": payload.thread_id}),
        );
        return Ok(false);
    };

    state
        .discord
        .execute_webhook(webhook_url, &thread.id, &payload.comment_description)
        .await
        .context("webhook delivery failed")?;
    state.audit.record(
        "webhook_delivered",
        json!({"thread_id": thread.id, "commenter_id": payload.commenter_id}),
    );
    Ok(true)
}

fn verify_sha256_hmac_signature(body: &[u8], signature_header: &str, secret: &str) -> Result<()> {
    let digest_hex = signature_header
        .strip_prefix("sha256=")
        .ok_or_else(|| anyhow!("signature must use sha256=<hex> format"))?;
    let signature_bytes = decode_hex(digest_hex)?;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .context("failed to initialize hmac verifier")?;
    mac.update(body);
    mac.verify_slice(&signature_bytes)
        .map_err(|_| anyhow!("signature verification failed"))
}
