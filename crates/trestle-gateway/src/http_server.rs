//! Axum server hosting the interaction and webhook endpoints.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use ed25519_dalek::VerifyingKey;
use serde_json::json;
use tokio::net::TcpListener;

use trestle_bridge::AuditLog;
use trestle_discord::DiscordApiClient;

mod interactions;
mod zendesk_webhook;

use interactions::handle_interactions;
use zendesk_webhook::handle_zendesk_webhook;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One entry of the commenter-to-delivery-channel routing table.
pub struct CommenterRoute {
    pub commenter_id: String,
    pub webhook_url: String,
}

/// Parses a repeatable `commenter_id=webhook_url` option, validating the URL
/// at startup so a bad table fails the boot instead of a live event.
pub fn parse_commenter_route(raw: &str) -> Result<CommenterRoute> {
    let (commenter_id, webhook_url) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid commenter route '{raw}', expected id=url"))?;
    let commenter_id = commenter_id.trim();
    let webhook_url = webhook_url.trim();
    if commenter_id.is_empty() {
        bail!("invalid commenter route '{raw}', commenter id cannot be empty");
    }
    reqwest::Url::parse(webhook_url)
        .with_context(|| format!("invalid webhook url in commenter route '{raw}'"))?;
    Ok(CommenterRoute {
        commenter_id: commenter_id.to_string(),
        webhook_url: webhook_url.to_string(),
    })
}

#[derive(Debug, Clone)]
/// Configuration for the HTTP ingress server.
pub struct HttpServerConfig {
    pub bind: String,
    /// Hex-encoded Ed25519 public key for interaction verification.
    pub interactions_public_key: String,
    /// Shared secret for webhook HMAC verification; unset disables it.
    pub webhook_secret: Option<String>,
    pub support_forum_id: String,
    pub guild_id: String,
    pub commenter_routes: Vec<CommenterRoute>,
}

pub(crate) struct HttpServerState {
    pub(crate) config: HttpServerConfig,
    pub(crate) verifying_key: VerifyingKey,
    pub(crate) routes: BTreeMap<String, String>,
    pub(crate) discord: DiscordApiClient,
    pub(crate) audit: AuditLog,
}

/// Validates the configuration and assembles the shared server state.
pub fn build_http_server_state(
    config: HttpServerConfig,
    discord: DiscordApiClient,
    audit: AuditLog,
) -> Result<Arc<HttpServerState>> {
    let verifying_key = parse_verifying_key(&config.interactions_public_key)?;
    let mut routes = BTreeMap::new();
    for route in &config.commenter_routes {
        if routes
            .insert(route.commenter_id.clone(), route.webhook_url.clone())
            .is_some()
        {
            bail!("duplicate commenter route for id '{}'", route.commenter_id);
        }
    }
    Ok(Arc::new(HttpServerState {
        config,
        verifying_key,
        routes,
        discord,
        audit,
    }))
}

pub(crate) fn build_http_router(state: Arc<HttpServerState>) -> Router {
    Router::new()
        .route("/interactions", post(handle_interactions))
        .route("/zendesk-webhook", post(handle_zendesk_webhook))
        .route("/healthz", get(handle_health))
        .with_state(state)
}

async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status":"ok"})))
}

/// Binds the configured address and serves until ctrl-c.
pub async fn run_http_server(
    config: HttpServerConfig,
    discord: DiscordApiClient,
    audit: AuditLog,
) -> Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid bind address '{}'", config.bind))?;
    let state = build_http_server_state(config, discord, audit)?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind http server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound http server address")?;
    println!(
        "trestle http server listening: addr={} routes={}",
        local_addr,
        state.routes.len()
    );

    let app = build_http_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("http server exited unexpectedly")
}

fn parse_verifying_key(raw_hex: &str) -> Result<VerifyingKey> {
    let bytes = decode_hex(raw_hex.trim())?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("interactions public key must be 32 bytes"))?;
    VerifyingKey::from_bytes(&bytes).context("invalid interactions public key")
}

pub(crate) fn decode_hex(raw: &str) -> Result<Vec<u8>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("hex digest cannot be empty");
    }
    if trimmed.len() % 2 != 0 {
        bail!("hex digest must have an even number of characters");
    }
    trimmed
        .as_bytes()
        .chunks(2)
        .map(|chunk| {
            let chunk = std::str::from_utf8(chunk).context("hex digest must be ascii")?;
            u8::from_str_radix(chunk, 16)
                .with_context(|| format!("invalid hex byte '{chunk}' in digest"))
        })
        .collect()
}
