use {anyhow::Result, async_trait::async_trait, tracing::warn};

/// Where an inbound command came from, and where replies go.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Conversation {
    /// Platform channel identifier (a Discord channel snowflake).
    pub channel_id: String,
    /// True for one-to-one direct-message channels.
    pub direct: bool,
}

impl Conversation {
    pub fn new(channel_id: impl Into<String>, direct: bool) -> Self {
        Self {
            channel_id: channel_id.into(),
            direct,
        }
    }
}

/// Send messages to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;
}

/// Send `text` and log instead of failing; chat delivery is best-effort.
///
/// Returns whether the platform accepted the message.
pub async fn send_best_effort(outbound: &dyn ChannelOutbound, to: &str, text: &str) -> bool {
    match outbound.send_text(to, text).await {
        Ok(()) => true,
        Err(e) => {
            warn!(channel = to, error = %e, "failed to send chat message");
            false
        },
    }
}
