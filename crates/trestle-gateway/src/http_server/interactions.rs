//! Signed slash-command interaction endpoint.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ed25519_dalek::{Signature, VerifyingKey};
use serde::Deserialize;
use serde_json::json;

use super::{decode_hex, HttpServerState};
use trestle_core::current_unix_timestamp_ms;

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

// Interaction protocol constants.
const INTERACTION_TYPE_PING: u64 = 1;
const INTERACTION_TYPE_APPLICATION_COMMAND: u64 = 2;
const RESPONSE_TYPE_PONG: u64 = 1;
const RESPONSE_TYPE_CHANNEL_MESSAGE_WITH_SOURCE: u64 = 4;

const TEST_COMMAND_EMOJIS: [&str; 8] = ["😄", "😌", "🤓", "😎", "🤖", "👋", "🌊", "✨"];

#[derive(Debug, Deserialize)]
struct InteractionRequest {
    #[serde(rename = "type")]
    interaction_type: u64,
    #[serde(default)]
    data: Option<InteractionCommandData>,
}

#[derive(Debug, Deserialize)]
struct InteractionCommandData {
    #[serde(default)]
    name: Option<String>,
}

pub(super) async fn handle_interactions(
    State(state): State<Arc<HttpServerState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(error) =
        verify_interaction_signature(&state.verifying_key, &headers, body.as_bytes())
    {
        tracing::warn!(error = %format!("{error:#}"), "rejected unsigned interaction");
        state
            .audit
            .record("interaction_rejected", json!({"reason": "invalid_signature"}));
        return (
            StatusCode::UNAUTHORIZED,
            Json(
                json!({"error":{"code":"invalid_signature","message":"interaction signature verification failed"}}),
            ),
        )
            .into_response();
    }

    let request = match serde_json::from_str::<InteractionRequest>(&body) {
        Ok(request) => request,
        Err(error) => {
            state
                .audit
                .record("interaction_rejected", json!({"reason": "parse_failed"}));
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error":{"code":"parse_failed","message":format!("invalid interaction payload: {error}")}})),
            )
                .into_response();
        }
    };

    match request.interaction_type {
        INTERACTION_TYPE_PING => {
            state.audit.record("interaction_ping", json!({}));
            (StatusCode::OK, Json(json!({"type": RESPONSE_TYPE_PONG}))).into_response()
        }
        INTERACTION_TYPE_APPLICATION_COMMAND => {
            let name = request
                .data
                .and_then(|data| data.name)
                .unwrap_or_default();
            if name == "test" {
                state
                    .audit
                    .record("interaction_command", json!({"name": name}));
                let emoji = TEST_COMMAND_EMOJIS
                    [(current_unix_timestamp_ms() as usize) % TEST_COMMAND_EMOJIS.len()];
                return (
                    StatusCode::OK,
                    Json(json!({
                        "type": RESPONSE_TYPE_CHANNEL_MESSAGE_WITH_SOURCE,
                        "data": { "content": format!("hello world {emoji}") },
                    })),
                )
                    .into_response();
            }
            tracing::warn!(command = %name, "unknown interaction command");
            state
                .audit
                .record("interaction_rejected", json!({"reason": "unknown_command", "name": name}));
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error":{"code":"unknown_command","message":"unknown command"}})),
            )
                .into_response()
        }
        other => {
            tracing::warn!(interaction_type = other, "unknown interaction type");
            state.audit.record(
                "interaction_rejected",
                json!({"reason": "unknown_type", "type": other}),
            );
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error":{"code":"unknown_type","message":"unknown interaction type"}})),
            )
                .into_response()
        }
    }
}

fn verify_interaction_signature(
    key: &VerifyingKey,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<()> {
    let signature_hex = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("missing {SIGNATURE_HEADER} header"))?;
    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("missing {TIMESTAMP_HEADER} header"))?;

    let signature_bytes = decode_hex(signature_hex)?;
    let signature =
        Signature::from_slice(&signature_bytes).context("malformed interaction signature")?;

    // The platform signs the concatenation of timestamp and raw body.
    let mut signed = Vec::with_capacity(timestamp.len() + body.len());
    signed.extend_from_slice(timestamp.as_bytes());
    signed.extend_from_slice(body);
    key.verify_strict(&signed, &signature)
        .map_err(|_| anyhow!("interaction signature verification failed"))
}
