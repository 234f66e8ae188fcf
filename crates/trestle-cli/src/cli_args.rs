//! Command-line and environment configuration for the trestle daemon.

use std::path::PathBuf;

use clap::Parser;

use trestle_discord::DEFAULT_DISCORD_API_BASE;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "trestle",
    about = "Bridges a Discord support forum with Zendesk tickets",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "TRESTLE_DISCORD_BOT_TOKEN",
        help = "Discord bot token used for gateway login and REST calls."
    )]
    pub discord_bot_token: String,

    #[arg(
        long,
        env = "TRESTLE_DISCORD_PUBLIC_KEY",
        help = "Hex-encoded Ed25519 public key that signs interaction requests."
    )]
    pub discord_public_key: String,

    #[arg(
        long,
        env = "TRESTLE_DISCORD_API_BASE",
        default_value = DEFAULT_DISCORD_API_BASE,
        help = "Discord REST API base URL."
    )]
    pub discord_api_base: String,

    #[arg(
        long,
        env = "TRESTLE_GUILD_ID",
        help = "Guild whose active threads are scanned when relaying webhook comments."
    )]
    pub guild_id: String,

    #[arg(
        long,
        env = "TRESTLE_SUPPORT_FORUM_ID",
        help = "Forum channel whose threads are bridged to tickets."
    )]
    pub support_forum_id: String,

    #[arg(
        long,
        env = "TRESTLE_ZENDESK_SUBDOMAIN",
        help = "Zendesk subdomain, e.g. 'acme' for acme.zendesk.com."
    )]
    pub zendesk_subdomain: String,

    #[arg(
        long,
        env = "TRESTLE_ZENDESK_EMAIL",
        help = "Zendesk agent email for the email/token credential pair."
    )]
    pub zendesk_email: String,

    #[arg(
        long,
        env = "TRESTLE_ZENDESK_API_TOKEN",
        help = "Zendesk API token for the email/token credential pair."
    )]
    pub zendesk_api_token: String,

    #[arg(
        long,
        env = "TRESTLE_ZENDESK_API_BASE",
        help = "Override the REST base URL derived from the subdomain (used by tests and proxies)."
    )]
    pub zendesk_api_base: Option<String>,

    #[arg(
        long,
        env = "TRESTLE_ZENDESK_THREAD_FIELD_ID",
        help = "Ticket custom field that mirrors the originating thread id; unset skips assignment."
    )]
    pub zendesk_thread_field_id: Option<u64>,

    #[arg(
        long,
        env = "TRESTLE_ZENDESK_GROUP_ID",
        help = "Group assigned to newly created tickets."
    )]
    pub zendesk_group_id: Option<u64>,

    #[arg(
        long,
        env = "TRESTLE_BIND_ADDRESS",
        default_value = "0.0.0.0",
        help = "Address the HTTP ingress binds to."
    )]
    pub bind_address: String,

    #[arg(
        long,
        env = "TRESTLE_PORT",
        default_value_t = 3000,
        help = "Port the HTTP ingress listens on."
    )]
    pub port: u16,

    #[arg(
        long,
        env = "TRESTLE_ZENDESK_WEBHOOK_SECRET",
        help = "Shared secret for inbound webhook HMAC verification; unset disables verification."
    )]
    pub zendesk_webhook_secret: Option<String>,

    #[arg(
        long = "commenter-webhook",
        env = "TRESTLE_COMMENTER_WEBHOOKS",
        value_delimiter = ',',
        help = "Delivery route as commenter_id=webhook_url; repeat per commenter."
    )]
    pub commenter_webhook: Vec<String>,

    #[arg(
        long,
        env = "TRESTLE_MARKER_PRE_DELAY_MS",
        default_value_t = 1_000,
        help = "Sleep before the first marker lookup of a reply event."
    )]
    pub marker_pre_delay_ms: u64,

    #[arg(
        long,
        env = "TRESTLE_MARKER_RESOLVE_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Marker lookup attempts before absence is treated as permanent."
    )]
    pub marker_resolve_attempts: usize,

    #[arg(
        long,
        env = "TRESTLE_MARKER_RETRY_DELAY_MS",
        default_value_t = 1_000,
        help = "Fixed spacing between marker lookup attempts."
    )]
    pub marker_retry_delay_ms: u64,

    #[arg(
        long,
        env = "TRESTLE_MARKER_FETCH_WINDOW",
        default_value_t = 100,
        value_parser = parse_positive_usize,
        help = "Message window fetched per marker lookup attempt."
    )]
    pub marker_fetch_window: usize,

    #[arg(
        long,
        env = "TRESTLE_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Timeout applied to every outbound HTTP request."
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long,
        env = "TRESTLE_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per outbound request for retryable failures."
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long,
        env = "TRESTLE_RETRY_BASE_DELAY_MS",
        default_value_t = 250,
        value_parser = parse_positive_u64,
        help = "Base delay between outbound request retries."
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long,
        env = "TRESTLE_AUDIT_LOG",
        default_value = "trestle-audit.jsonl",
        help = "Append-only JSONL audit log path."
    )]
    pub audit_log: PathBuf,
}
