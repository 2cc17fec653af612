//! Discord transport: gateway event handling, message delivery and the
//! presence updater.

pub mod handler;
pub mod outbound;
pub mod presence;

use std::sync::Arc;

use {
    anyhow::{Context as _, Result},
    secrecy::ExposeSecret,
    serenity::{Client, http::Http, prelude::GatewayIntents},
    tracing::{info, warn},
};

use {
    warden_commands::{DispatchSettings, Dispatcher},
    warden_config::WardenConfig,
    warden_remote::{MacAddress, MagicPacketSender, RemoteClient},
};

pub use {
    handler::{Handler, PresenceSettings},
    outbound::DiscordOutbound,
};

/// Gateway events the bot needs: guild and direct messages with content.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// Connect to Discord and serve commands until Ctrl-C.
pub async fn run_bot(config: &WardenConfig) -> Result<()> {
    let token = config
        .discord
        .token
        .as_ref()
        .context("discord.token is not set")?
        .expose_secret()
        .clone();
    let mac: MacAddress = config
        .client
        .mac
        .parse()
        .with_context(|| format!("invalid client.mac {:?}", config.client.mac))?;

    let remote = Arc::new(RemoteClient::with_timeouts(
        config.client.base_url(),
        config.timing.probe_timeout(),
        config.timing.request_timeout(),
    ));
    let wake = Arc::new(MagicPacketSender::new(mac, config.client.wake_broadcast.clone()));
    let outbound = Arc::new(DiscordOutbound::new(Arc::new(Http::new(&token))));
    let dispatcher = Arc::new(Dispatcher::new(
        remote.clone(),
        wake,
        outbound,
        DispatchSettings::from_config(config),
    ));

    let presence = config.discord.presence.then(|| PresenceSettings {
        prober: remote.clone(),
        interval: config.discord.presence_interval(),
    });

    let mut client = Client::builder(&token, intents())
        .event_handler(Handler::new(dispatcher, presence))
        .await
        .context("failed to create discord client")?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutting down");
                shard_manager.shutdown_all().await;
            },
            Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
        }
    });

    info!(
        client = %remote.base_url(),
        prefix = %config.discord.command_prefix,
        "starting discord bot"
    );
    client.start().await.context("discord client stopped")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_include_message_content() {
        let intents = intents();
        assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(intents.contains(GatewayIntents::DIRECT_MESSAGES));
        assert!(!intents.contains(GatewayIntents::GUILD_PRESENCES));
    }
}
