use anyhow::{anyhow, Result};
use chrono::Utc;
use dotenvy::dotenv;
use log::{error, info};
use serde_json::json;
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::application::component::ButtonStyle;
use serenity::model::application::interaction::Interaction;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, MessageId};
use serenity::prelude::*;
use std::sync::Arc;

use reminder_bot::core::{
    truncate_for_message, CallbackQuery, ChatId, Config, IncomingMessage, MessageRef, Messenger,
    SendOptions,
};
use reminder_bot::features::reminders::{DeliveryScheduler, ReminderService, TaskStore};
use reminder_bot::RemindHandler;

/// Discord interaction response type: reply with a new message
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
/// Discord message flag: visible only to the interacting user
const EPHEMERAL: u64 = 1 << 6;

/// `Messenger` backed by the Discord REST API
struct DiscordMessenger {
    http: Arc<Http>,
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef> {
        let content = truncate_for_message(text);
        let message = ChannelId(chat_id as u64)
            .send_message(&self.http, |m| {
                m.content(content);
                if !options.choices.is_empty() {
                    m.components(|c| {
                        c.create_action_row(|row| {
                            for choice in &options.choices {
                                row.create_button(|button| {
                                    button
                                        .custom_id(&choice.id)
                                        .label(&choice.label)
                                        .style(ButtonStyle::Primary)
                                });
                            }
                            row
                        })
                    });
                }
                m
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: message.id.0,
        })
    }

    async fn answer_callback(&self, callback_id: &str, text: &str, is_alert: bool) -> Result<()> {
        // Callback ids are "<interaction id>:<interaction token>"
        let (interaction_id, token) = callback_id
            .split_once(':')
            .ok_or_else(|| anyhow!("Malformed callback id"))?;
        let interaction_id: u64 = interaction_id.parse()?;

        let content = if is_alert {
            format!("⚠️ {text}")
        } else {
            text.to_string()
        };
        let response = json!({
            "type": CHANNEL_MESSAGE_WITH_SOURCE,
            "data": {
                "content": truncate_for_message(&content),
                "flags": EPHEMERAL,
            }
        });

        self.http
            .create_interaction_response(interaction_id, token, &response)
            .await?;
        Ok(())
    }

    async fn edit_message(&self, target: MessageRef, text: &str) -> Result<()> {
        let content = truncate_for_message(text);
        ChannelId(target.chat_id as u64)
            .edit_message(&self.http, MessageId(target.message_id), |m| {
                m.content(content).components(|c| c)
            })
            .await?;
        Ok(())
    }
}

struct Handler {
    reminders: Arc<RemindHandler>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, _ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let message = IncomingMessage {
            chat_id: msg.channel_id.0 as i64,
            user_id: msg.author.id.0 as i64,
            text: msg.content.clone(),
        };

        if let Err(e) = self.reminders.handle_message(&message).await {
            error!("Error handling message in channel {}: {e}", msg.channel_id);
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);
        info!(
            "⏰ {} reminders armed",
            self.reminders.service().scheduler().armed_count()
        );
    }

    async fn interaction_create(&self, _ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::MessageComponent(component) => {
                let callback = CallbackQuery {
                    user_id: component.user.id.0 as i64,
                    callback_id: format!("{}:{}", component.id.0, component.token),
                    payload: component.data.custom_id.clone(),
                    message: Some(MessageRef {
                        chat_id: component.channel_id.0 as i64,
                        message_id: component.message.id.0,
                    }),
                };

                if let Err(e) = self.reminders.handle_callback(&callback).await {
                    error!(
                        "Error handling component interaction '{}': {e}",
                        component.data.custom_id
                    );
                }
            }
            Interaction::Ping(_) => {
                info!("Ping interaction received - Discord health check");
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting reminder bot...");
    info!(
        "🕰️ Reminder zone {}, task file {}",
        config.timezone.name(),
        config.tasks_path.display()
    );

    let http = Arc::new(Http::new(&config.discord_token));
    let messenger: Arc<dyn Messenger> = Arc::new(DiscordMessenger { http });

    let store = TaskStore::load(&config.tasks_path).into_shared();
    let scheduler =
        DeliveryScheduler::new(store.clone(), messenger.clone(), config.lateness_tolerance);
    let service = ReminderService::new(config.timezone, store, scheduler);

    // Persisted reminders are re-armed before the gateway delivers any input
    let report = service.recovery().run(Utc::now()).await.map_err(|e| {
        error!("Startup recovery failed: {e}");
        anyhow!("Could not restore reminders: {}", e)
    })?;
    info!(
        "♻️ Restored {} reminders ({} past-due dropped)",
        report.rearmed, report.dropped
    );

    let handler = Handler {
        reminders: Arc::new(RemindHandler::new(service, messenger)),
    };

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow!("Client creation failed: {}", e)
        })?;

    info!("Establishing WebSocket connection to Discord gateway...");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
