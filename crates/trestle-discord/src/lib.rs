//! Discord REST API client for the trestle bridge.
//!
//! Covers the small slice of the Discord HTTP API the bridge needs: thread
//! message windows, message posting, active-thread listing, and webhook
//! execution for relayed ticket comments.

mod discord_api;

pub use discord_api::{
    DiscordApiClient, DiscordMessage, DiscordThread, DiscordUser, DEFAULT_DISCORD_API_BASE,
};
