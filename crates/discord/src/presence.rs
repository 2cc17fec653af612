//! Mirrors the client's online state in the bot's custom activity.

use std::{sync::Arc, time::Duration};

use {
    serenity::{gateway::ActivityData, prelude::Context},
    tokio::time::MissedTickBehavior,
    tracing::debug,
};

use warden_remote::Prober;

pub const ONLINE_STATUS: &str = "✅ Client is online";
pub const OFFLINE_STATUS: &str = "❌ Client is offline";

/// Where the status text ends up.
pub trait StatusDisplay: Send + Sync {
    fn show(&self, status: &str);
}

impl StatusDisplay for Context {
    fn show(&self, status: &str) {
        self.set_activity(Some(ActivityData::custom(status)));
    }
}

/// Last state shown, so the activity is only touched on changes.
#[derive(Debug, Default)]
pub struct PresenceState {
    online: Option<bool>,
}

impl PresenceState {
    /// The status to display after a probe, or `None` if nothing changed.
    pub fn observe(&mut self, online: bool) -> Option<&'static str> {
        if self.online == Some(online) {
            return None;
        }
        self.online = Some(online);
        Some(if online {
            ONLINE_STATUS
        } else {
            OFFLINE_STATUS
        })
    }
}

/// Probe every `interval` and update `display` when the state flips. Runs
/// until the task is aborted.
pub async fn run_presence(
    prober: Arc<dyn Prober>,
    display: Arc<dyn StatusDisplay>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut state = PresenceState::default();
    loop {
        ticker.tick().await;
        let online = prober.probe().await;
        if let Some(status) = state.observe(online) {
            debug!(online, "client presence changed");
            display.show(status);
        }
    }
}
