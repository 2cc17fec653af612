//! Config schema: chat transport, remote client and timing sections.
use std::time::Duration;

use {secrecy::Secret, serde::Deserialize};

/// Placeholder in `help_message` replaced with the configured prefix.
pub const PREFIX_PLACEHOLDER: &str = "${command_prefix}";

const DEFAULT_HELP_MESSAGE: &str = "\
:information_source: **Available commands:**
`${command_prefix}help` shows this message
`${command_prefix}ping` checks whether the client is online
`${command_prefix}wakeup` wakes the client via Wake-on-LAN
`${command_prefix}shutdown` shuts the client down
`${command_prefix}reboot` reboots the client
`${command_prefix}scripts` lists the scripts available on the client
`${command_prefix}scripts show <script>` shows the content of a script
`${command_prefix}run <script>` runs a script and streams its output";

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub discord: DiscordConfig,
    pub client: ClientConfig,
    pub timing: TimingConfig,
}

/// Problems found by [`WardenConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("discord.token is not set (config file or WARDEN_DISCORD_TOKEN)")]
    MissingToken,
    #[error("discord.command_prefix must not be empty")]
    EmptyPrefix,
    #[error("client.address is not set")]
    MissingAddress,
    #[error("client.mac is not set")]
    MissingMac,
    #[error("timing.{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

impl WardenConfig {
    /// Replace `${command_prefix}` in the help message with the actual prefix.
    pub fn resolve_placeholders(&mut self) {
        self.discord.help_message = self
            .discord
            .help_message
            .replace(PREFIX_PLACEHOLDER, &self.discord.command_prefix);
    }

    /// Collect every problem that would prevent the bot from starting.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.discord.token.is_none() {
            errors.push(ConfigError::MissingToken);
        }
        if self.discord.command_prefix.is_empty() {
            errors.push(ConfigError::EmptyPrefix);
        }
        if self.client.address.trim().is_empty() {
            errors.push(ConfigError::MissingAddress);
        }
        if self.client.mac.trim().is_empty() {
            errors.push(ConfigError::MissingMac);
        }
        for (name, value) in [
            ("poll_interval_ms", self.timing.poll_interval_ms),
            ("flush_interval_ms", self.timing.flush_interval_ms),
            ("presence_interval_ms", self.discord.presence_interval_ms),
        ] {
            if value == 0 {
                errors.push(ConfigError::ZeroInterval(name));
            }
        }
        errors
    }
}

/// Discord connection and command surface.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. `WARDEN_DISCORD_TOKEN` takes precedence when set.
    pub token: Option<Secret<String>>,
    pub command_prefix: String,
    /// Whether commands are accepted in direct messages.
    pub dm_enabled: bool,
    pub help_message: String,
    /// Show the client's online state as the bot's activity.
    pub presence: bool,
    pub presence_interval_ms: u64,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("command_prefix", &self.command_prefix)
            .field("dm_enabled", &self.dm_enabled)
            .field("presence", &self.presence)
            .field("presence_interval_ms", &self.presence_interval_ms)
            .finish_non_exhaustive()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            command_prefix: "!".into(),
            dm_enabled: true,
            help_message: DEFAULT_HELP_MESSAGE.into(),
            presence: true,
            presence_interval_ms: 1000,
        }
    }
}

impl DiscordConfig {
    pub fn presence_interval(&self) -> Duration {
        Duration::from_millis(self.presence_interval_ms)
    }
}

/// The single remote host under control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host[:port]` of the client's control API; an explicit scheme is kept.
    pub address: String,
    /// Hardware address used for Wake-on-LAN.
    pub mac: String,
    /// Destination for the magic packet.
    pub wake_broadcast: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            mac: String::new(),
            wake_broadcast: "255.255.255.255:9".into(),
        }
    }
}

impl ClientConfig {
    /// Base URL of the control API without a trailing slash.
    pub fn base_url(&self) -> String {
        let address = self.address.trim().trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{address}")
        }
    }
}

/// Timeouts and cadences, all in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub probe_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub online_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub reboot_grace_ms: u64,
    pub flush_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 3000,
            request_timeout_ms: 10_000,
            online_timeout_ms: 60_000,
            poll_interval_ms: 1000,
            reboot_grace_ms: 5000,
            flush_interval_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn online_timeout(&self) -> Duration {
        Duration::from_millis(self.online_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reboot_grace(&self) -> Duration {
        Duration::from_millis(self.reboot_grace_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn defaults_match_documented_values() {
        let cfg = WardenConfig::default();
        assert_eq!(cfg.discord.command_prefix, "!");
        assert!(cfg.discord.dm_enabled);
        assert_eq!(cfg.timing.online_timeout(), Duration::from_secs(60));
        assert_eq!(cfg.timing.poll_interval(), Duration::from_secs(1));
        assert_eq!(cfg.timing.reboot_grace(), Duration::from_secs(5));
        assert_eq!(cfg.timing.flush_interval(), Duration::from_secs(1));
        assert_eq!(cfg.client.wake_broadcast, "255.255.255.255:9");
    }

    #[test]
    fn resolve_placeholders_uses_prefix() {
        let mut cfg = WardenConfig::default();
        cfg.discord.command_prefix = "?".into();
        cfg.discord.help_message = "try ${command_prefix}ping or ${command_prefix}help".into();
        cfg.resolve_placeholders();
        assert_eq!(cfg.discord.help_message, "try ?ping or ?help");
    }

    #[test]
    fn validate_reports_every_missing_field() {
        let errors = WardenConfig::default().validate();
        assert_eq!(errors, vec![
            ConfigError::MissingToken,
            ConfigError::MissingAddress,
            ConfigError::MissingMac,
        ]);
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let mut cfg = WardenConfig::default();
        cfg.discord.token = Some(Secret::new("t".into()));
        cfg.client.address = "10.0.0.2:8080".into();
        cfg.client.mac = "00:11:22:33:44:55".into();
        cfg.timing.poll_interval_ms = 0;
        assert_eq!(cfg.validate(), vec![ConfigError::ZeroInterval(
            "poll_interval_ms"
        )]);
    }

    #[test]
    fn base_url_adds_scheme_once() {
        let mut client = ClientConfig {
            address: "192.168.1.20:3000/".into(),
            ..Default::default()
        };
        assert_eq!(client.base_url(), "http://192.168.1.20:3000");
        client.address = "https://pc.lan".into();
        assert_eq!(client.base_url(), "https://pc.lan");
    }

    #[test]
    fn debug_redacts_token() {
        let discord = DiscordConfig {
            token: Some(Secret::new("super-secret-token".into())),
            ..Default::default()
        };
        let out = format!("{discord:?}");
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains("super-secret-token"));
        assert_eq!(
            discord.token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("super-secret-token")
        );
    }
}
