//! Typed wrappers over the Discord REST endpoints used by the bridge.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

#[cfg(test)]
mod tests;

/// Default REST endpoint for the public Discord API.
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Debug, Clone, Deserialize)]
/// Message author as returned by the messages endpoints.
pub struct DiscordUser {
    pub id: String,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
/// A channel or thread message.
pub struct DiscordMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    pub author: DiscordUser,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
/// A thread entry from the guild active-threads listing.
pub struct DiscordThread {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DiscordActiveThreadsResponse {
    #[serde(default)]
    threads: Vec<DiscordThread>,
}

#[derive(Clone)]
/// REST client authenticated with a bot token.
pub struct DiscordApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl DiscordApiClient {
    pub fn new(
        api_base: String,
        bot_token: String,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let trimmed_base = api_base.trim().trim_end_matches('/');
        if trimmed_base.is_empty() {
            bail!("discord api base cannot be empty");
        }
        let bot_token = bot_token.trim().to_string();
        if bot_token.is_empty() {
            bail!("discord bot token cannot be empty");
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("trestle-bridge"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create discord api client")?;

        Ok(Self {
            http,
            api_base: trimmed_base.to_string(),
            bot_token,
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    /// Fetches the most recent messages of a thread, newest first.
    pub async fn fetch_thread_messages(
        &self,
        thread_id: &str,
        limit: usize,
    ) -> Result<Vec<DiscordMessage>> {
        let url = format!("{}/channels/{thread_id}/messages", self.api_base);
        self.request_json("thread message fetch", || {
            self.http
                .get(url.as_str())
                .query(&[("limit", limit.to_string())])
                .header(reqwest::header::AUTHORIZATION, self.bot_authorization())
        })
        .await
    }

    /// Posts a plain-text message into a channel or thread.
    pub async fn post_message(&self, channel_id: &str, content: &str) -> Result<DiscordMessage> {
        let url = format!("{}/channels/{channel_id}/messages", self.api_base);
        let payload = json!({ "content": content });
        self.request_json("message post", || {
            self.http
                .post(url.as_str())
                .header(reqwest::header::AUTHORIZATION, self.bot_authorization())
                .json(&payload)
        })
        .await
    }

    /// Lists the guild's active (non-archived) threads. Callers filter by
    /// parent forum id; archived threads are absent from this listing.
    pub async fn fetch_active_threads(&self, guild_id: &str) -> Result<Vec<DiscordThread>> {
        let url = format!("{}/guilds/{guild_id}/threads/active", self.api_base);
        let response: DiscordActiveThreadsResponse = self
            .request_json("active thread fetch", || {
                self.http
                    .get(url.as_str())
                    .header(reqwest::header::AUTHORIZATION, self.bot_authorization())
            })
            .await?;
        Ok(response.threads)
    }

    /// Delivers content through a standalone webhook URL, targeted at a
    /// thread. The URL embeds its own credential; no bot token is sent.
    pub async fn execute_webhook(
        &self,
        webhook_url: &str,
        thread_id: &str,
        content: &str,
    ) -> Result<()> {
        let webhook_url = webhook_url.trim();
        if webhook_url.is_empty() {
            bail!("webhook url cannot be empty");
        }
        let payload = json!({ "content": content });
        self.request_accepted("webhook delivery", || {
            self.http
                .post(webhook_url)
                .query(&[("thread_id", thread_id)])
                .json(&payload)
        })
        .await
    }

    fn bot_authorization(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    async fn request_json<T, F>(&self, operation: &str, builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let response = self.request_with_retry(operation, builder).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode discord {operation} response"))
    }

    async fn request_accepted<F>(&self, operation: &str, builder: F) -> Result<()>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        self.request_with_retry(operation, builder).await.map(|_| ())
    }

    async fn request_with_retry<F>(&self, operation: &str, builder: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            match builder().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if attempt < self.retry_max_attempts
                        && is_retryable_discord_status(status.as_u16())
                    {
                        sleep_retry_backoff(self.retry_base_delay_ms, attempt).await;
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    bail!(
                        "discord {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        sleep_retry_backoff(self.retry_base_delay_ms, attempt).await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("discord {operation} request failed"));
                }
            }
        }
    }
}

fn is_retryable_discord_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
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
