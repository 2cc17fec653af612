use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    serenity::{
        model::{channel::Message, gateway::Ready},
        prelude::{Context, EventHandler},
    },
    tracing::{debug, info},
};

use {warden_channels::Conversation, warden_commands::Dispatcher, warden_remote::Prober};

use crate::presence::run_presence;

/// Periodic presence updates, if enabled.
pub struct PresenceSettings {
    pub prober: Arc<dyn Prober>,
    pub interval: Duration,
}

/// Gateway event handler. Serenity runs every event on its own task, so a
/// long command never delays the next message.
pub struct Handler {
    dispatcher: Arc<Dispatcher>,
    presence: Option<PresenceSettings>,
    presence_started: AtomicBool,
}

impl Handler {
    pub fn new(dispatcher: Arc<Dispatcher>, presence: Option<PresenceSettings>) -> Self {
        Self {
            dispatcher,
            presence,
            presence_started: AtomicBool::new(false),
        }
    }
}

/// The conversation a Discord message belongs to. Messages without a guild
/// are direct messages.
pub fn conversation_of(msg: &Message) -> Conversation {
    Conversation::new(msg.channel_id.get().to_string(), msg.guild_id.is_none())
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "connected to discord");

        let Some(presence) = &self.presence else {
            return;
        };
        // `ready` fires again after reconnects.
        if self.presence_started.swap(true, Ordering::SeqCst) {
            return;
        }
        tokio::spawn(run_presence(
            Arc::clone(&presence.prober),
            Arc::new(ctx),
            presence.interval,
        ));
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let conversation = conversation_of(&msg);
        if self.dispatcher.handle_message(&msg.content, conversation).await {
            debug!(author = %msg.author.name, "command handled");
        }
    }
}
