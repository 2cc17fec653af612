//! Runs operator commands against the remote host and reports back.

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use {
    warden_channels::{ChannelOutbound, Conversation, send_best_effort},
    warden_config::WardenConfig,
    warden_remote::{HostControl, RemoteError, WaitOptions, WakeSignal, wait_until_online},
};

use crate::{
    relay,
    reply::Reply,
    request::{Command, CommandRequest},
    sink::{MAX_MESSAGE_CHARS, split_message},
};

/// The parts of the configuration the dispatcher needs.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub prefix: String,
    pub help_message: String,
    pub dm_enabled: bool,
    pub wait: WaitOptions,
    /// Pause between a reboot request and the first probe.
    pub reboot_grace: Duration,
    pub flush_interval: Duration,
}

impl DispatchSettings {
    pub fn from_config(config: &WardenConfig) -> Self {
        Self {
            prefix: config.discord.command_prefix.clone(),
            help_message: config.discord.help_message.clone(),
            dm_enabled: config.discord.dm_enabled,
            wait: WaitOptions {
                timeout: config.timing.online_timeout(),
                interval: config.timing.poll_interval(),
            },
            reboot_grace: config.timing.reboot_grace(),
            flush_interval: config.timing.flush_interval(),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        let mut config = WardenConfig::default();
        config.resolve_placeholders();
        Self::from_config(&config)
    }
}

/// Maps inbound commands to remote host operations.
///
/// Each command runs to completion on the calling task; callers spawn one
/// task per inbound message so commands never block each other.
pub struct Dispatcher {
    host: Arc<dyn HostControl>,
    wake: Arc<dyn WakeSignal>,
    outbound: Arc<dyn ChannelOutbound>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        host: Arc<dyn HostControl>,
        wake: Arc<dyn WakeSignal>,
        outbound: Arc<dyn ChannelOutbound>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            host,
            wake,
            outbound,
            settings,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Handle one chat message. Returns false when the message is not a
    /// command (no prefix, unknown command).
    pub async fn handle_message(&self, content: &str, conversation: Conversation) -> bool {
        let Some(request) = CommandRequest::parse(content, &self.settings.prefix, conversation)
        else {
            return false;
        };
        if request.conversation.direct && !self.settings.dm_enabled {
            debug!(channel = %request.conversation.channel_id, "rejecting direct message");
            self.reply(&request.conversation, Reply::DirectMessagesDisabled)
                .await;
            return true;
        }
        self.dispatch(request).await
    }

    /// Run a parsed request. Returns false for unknown commands, which are
    /// ignored without a reply.
    pub async fn dispatch(&self, request: CommandRequest) -> bool {
        let Some(command) = request.command() else {
            debug!(command = %request.name, "ignoring unknown command");
            return false;
        };
        let to = &request.conversation;
        info!(command = command.name(), channel = %to.channel_id, "handling command");

        match command {
            Command::Help => {
                self.reply(to, Reply::Help(self.settings.help_message.clone()))
                    .await
            },
            Command::Ping => self.ping(to).await,
            Command::Wakeup => self.wakeup(to).await,
            Command::Shutdown => self.shutdown(to).await,
            Command::Reboot => self.reboot(to).await,
            Command::ListScripts => self.list_scripts(to).await,
            Command::ShowScript(None) => {
                self.usage(to, Reply::ShowUsage {
                    prefix: self.settings.prefix.clone(),
                })
                .await
            },
            Command::ShowScript(Some(name)) => self.show_script(to, &name).await,
            Command::RunScript(None) => {
                self.usage(to, Reply::RunUsage {
                    prefix: self.settings.prefix.clone(),
                })
                .await
            },
            Command::RunScript(Some(name)) => {
                let outcome = relay::run_script(
                    self.host.as_ref(),
                    Arc::clone(&self.outbound),
                    &to.channel_id,
                    &name,
                    self.settings.flush_interval,
                )
                .await;
                debug!(script = %name, ?outcome, "script run finished");
            },
        }
        true
    }

    async fn ping(&self, to: &Conversation) {
        self.reply(to, Reply::PingSending).await;
        let reply = if self.host.probe().await {
            Reply::Online
        } else {
            Reply::Offline
        };
        self.reply(to, reply).await;
    }

    async fn wakeup(&self, to: &Conversation) {
        if self.host.probe().await {
            self.reply(to, Reply::AlreadyOnline).await;
            return;
        }

        let sent = match self.wake.wake().await {
            Ok(()) => Reply::WakeSent,
            Err(e) => {
                warn!(error = %e, "failed to send wake signal");
                Reply::WakeFailed
            },
        };
        self.reply(to, sent).await;

        let reply = if self.wait_until_online().await {
            Reply::NowOnline
        } else {
            Reply::StillOfflineAfterWake
        };
        self.reply(to, reply).await;
    }

    async fn shutdown(&self, to: &Conversation) {
        self.reply(to, Reply::ShutdownSending).await;
        let reply = match self.host.shutdown().await {
            Ok(()) => Reply::ShuttingDown,
            Err(e) => {
                warn!(error = %e, "shutdown request failed");
                if e.is_transport() {
                    Reply::ShutdownUnreachable
                } else {
                    Reply::ShutdownFailed
                }
            },
        };
        self.reply(to, reply).await;
    }

    async fn reboot(&self, to: &Conversation) {
        self.reply(to, Reply::RebootSending).await;
        let reply = match self.host.reboot().await {
            Ok(()) => Reply::Rebooting,
            Err(e) => {
                warn!(error = %e, "reboot request failed");
                if e.is_transport() {
                    Reply::RebootUnreachable
                } else {
                    Reply::RebootFailed
                }
            },
        };
        self.reply(to, reply).await;

        // The host may still answer /ping for a moment before it goes down.
        tokio::time::sleep(self.settings.reboot_grace).await;

        let reply = if self.wait_until_online().await {
            Reply::BackOnline
        } else {
            Reply::StillOfflineAfterReboot
        };
        self.reply(to, reply).await;
    }

    async fn list_scripts(&self, to: &Conversation) {
        let reply = match self.host.list_scripts().await {
            Ok(names) if names.is_empty() => Reply::NoScripts,
            Ok(names) => Reply::ScriptList(names),
            Err(e) => Self::script_error(&e),
        };
        self.reply(to, reply).await;
    }

    async fn show_script(&self, to: &Conversation, name: &str) {
        let reply = match self.host.show_script(name).await {
            Ok(body) => Reply::script_source(name, &body),
            Err(e) if e.is_not_found() => Reply::ScriptNotFound,
            Err(e) => Self::script_error(&e),
        };
        self.reply(to, reply).await;
    }

    fn script_error(error: &RemoteError) -> Reply {
        if error.is_forbidden() {
            return Reply::ScriptsDisabled;
        }
        warn!(error = %error, "script request failed");
        match error.status() {
            Some(status) => Reply::ScriptRequestFailed(status),
            None => Reply::ScriptsUnreachable,
        }
    }

    async fn wait_until_online(&self) -> bool {
        wait_until_online(self.host.as_ref(), self.settings.wait).await
    }

    async fn usage(&self, to: &Conversation, usage: Reply) {
        self.reply(to, Reply::MissingScriptName {
            prefix: self.settings.prefix.clone(),
        })
        .await;
        self.reply(to, usage).await;
    }

    async fn reply(&self, to: &Conversation, reply: Reply) {
        for part in split_message(&reply.to_string(), MAX_MESSAGE_CHARS) {
            send_best_effort(self.outbound.as_ref(), &to.channel_id, &part).await;
        }
    }
}
