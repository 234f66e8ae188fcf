//! trestle - Discord support-forum to Zendesk bridge daemon.

mod cli_args;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use cli_args::Cli;
use trestle_bridge::{
    run_discord_gateway, AuditLog, BridgeRuntime, BridgeRuntimeConfig, ConsistencyPolicy,
};
use trestle_discord::DiscordApiClient;
use trestle_gateway::{parse_commenter_route, run_http_server, HttpServerConfig};
use trestle_zendesk::{api_base_for_subdomain, ZendeskApiClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Validate the routing table before anything touches the network.
    let commenter_routes = cli
        .commenter_webhook
        .iter()
        .map(|raw| parse_commenter_route(raw))
        .collect::<Result<Vec<_>>>()?;

    let zendesk_api_base = cli
        .zendesk_api_base
        .clone()
        .unwrap_or_else(|| api_base_for_subdomain(&cli.zendesk_subdomain));

    let discord = DiscordApiClient::new(
        cli.discord_api_base.clone(),
        cli.discord_bot_token.clone(),
        cli.request_timeout_ms,
        cli.retry_max_attempts,
        cli.retry_base_delay_ms,
    )?;
    let zendesk = ZendeskApiClient::new(
        zendesk_api_base,
        cli.zendesk_email.clone(),
        cli.zendesk_api_token.clone(),
        cli.request_timeout_ms,
        cli.retry_max_attempts,
        cli.retry_base_delay_ms,
    )?;
    let audit = AuditLog::open(cli.audit_log.clone())?;

    let runtime = Arc::new(BridgeRuntime::new(
        BridgeRuntimeConfig {
            support_forum_id: cli.support_forum_id.clone(),
            zendesk_thread_field_id: cli.zendesk_thread_field_id,
            zendesk_group_id: cli.zendesk_group_id,
            consistency: ConsistencyPolicy {
                pre_resolve_delay_ms: cli.marker_pre_delay_ms,
                resolve_max_attempts: cli.marker_resolve_attempts,
                resolve_retry_delay_ms: cli.marker_retry_delay_ms,
                fetch_window: cli.marker_fetch_window,
            },
        },
        discord.clone(),
        zendesk,
        audit.clone(),
    ));

    let http_config = HttpServerConfig {
        bind: format!("{}:{}", cli.bind_address, cli.port),
        interactions_public_key: cli.discord_public_key.clone(),
        webhook_secret: cli.zendesk_webhook_secret.clone(),
        support_forum_id: cli.support_forum_id.clone(),
        guild_id: cli.guild_id.clone(),
        commenter_routes,
    };

    audit.record(
        "server_started",
        json!({"port": cli.port, "forum_id": cli.support_forum_id}),
    );
    tracing::info!(port = cli.port, forum_id = %cli.support_forum_id, "starting trestle");

    // Both halves run until one exits: the HTTP ingress stops on ctrl-c,
    // which ends the select and drops the gateway connection with it.
    let bot_token = cli.discord_bot_token.clone();
    tokio::select! {
        result = run_http_server(http_config, discord, audit) => result,
        result = run_discord_gateway(&bot_token, runtime) => result,
    }
}
