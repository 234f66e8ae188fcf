//! Serenity gateway adapter feeding Discord events into the bridge runtime.
//!
//! Per-event failures are logged and isolated; one failing handler never
//! takes down the gateway connection or the process.

use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use serenity::all::{
    Channel, Context, EventHandler, GatewayIntents, GuildChannel, Message, Ready,
};
use serenity::async_trait;
use serenity::Client;

use super::{BridgeRuntime, MessageCreated, ThreadCreated};

struct BridgeEventHandler {
    runtime: Arc<BridgeRuntime>,
}

#[async_trait]
impl EventHandler for BridgeEventHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, "discord gateway connected");
    }

    async fn thread_create(&self, _ctx: Context, thread: GuildChannel) {
        let event = ThreadCreated {
            thread_id: thread.id.to_string(),
            parent_id: thread
                .parent_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            title: thread.name.clone(),
        };
        if let Err(error) = self.runtime.handle_thread_created(&event).await {
            tracing::error!(
                thread_id = %event.thread_id,
                error = %format!("{error:#}"),
                "thread-created handler failed"
            );
        }
    }

    async fn message(&self, ctx: Context, message: Message) {
        // Gateway message payloads do not carry the thread's parent channel;
        // resolve it so the forum guard in the runtime can apply.
        let parent_id = match message.channel_id.to_channel(&ctx).await {
            Ok(Channel::Guild(channel)) if channel.thread_metadata.is_some() => {
                channel.parent_id.map(|id| id.to_string())
            }
            Ok(_) => None,
            Err(error) => {
                tracing::warn!(
                    channel_id = %message.channel_id,
                    error = %format!("{error:#}"),
                    "failed to resolve message channel"
                );
                None
            }
        };
        let event = MessageCreated {
            thread_id: message.channel_id.to_string(),
            parent_id,
            author_id: message.author.id.to_string(),
            author_is_bot: message.author.bot,
            content: message.content.clone(),
        };
        if let Err(error) = self.runtime.handle_message_created(&event).await {
            tracing::error!(
                thread_id = %event.thread_id,
                error = %format!("{error:#}"),
                "message-created handler failed"
            );
        }
    }
}

/// Runs the long-lived gateway connection until it ends or the process
/// shuts down.
pub async fn run_discord_gateway(bot_token: &str, runtime: Arc<BridgeRuntime>) -> Result<()> {
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(bot_token, intents)
        .event_handler(BridgeEventHandler { runtime })
        .await
        .context("failed to build discord gateway client")?;
    client
        .start()
        .await
        .context("discord gateway connection ended")
}
