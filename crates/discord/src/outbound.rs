use std::sync::Arc;

use {
    anyhow::{Context as _, Result, ensure},
    async_trait::async_trait,
    serenity::{http::Http, model::id::ChannelId},
    tracing::trace,
};

use warden_channels::ChannelOutbound;

/// Sends plain text messages through Discord's REST API.
pub struct DiscordOutbound {
    http: Arc<Http>,
}

impl DiscordOutbound {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

/// Parse a channel snowflake as carried in [`warden_channels::Conversation`].
pub fn parse_channel_id(to: &str) -> Result<ChannelId> {
    let id: u64 = to
        .parse()
        .with_context(|| format!("invalid discord channel id: {to}"))?;
    ensure!(id != 0, "invalid discord channel id: 0");
    Ok(ChannelId::new(id))
}

#[async_trait]
impl ChannelOutbound for DiscordOutbound {
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        let channel = parse_channel_id(to)?;
        channel.say(&*self.http, text).await?;
        trace!(channel = to, chars = text.chars().count(), "message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ids() {
        assert_eq!(parse_channel_id("1234").unwrap().get(), 1234);
        assert!(parse_channel_id("0").is_err());
        assert!(parse_channel_id("general").is_err());
        assert!(parse_channel_id("").is_err());
    }
}
