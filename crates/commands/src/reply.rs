//! Operator-facing messages.

use std::fmt;

use warden_remote::ScriptErrorCode;

use crate::sink::MAX_MESSAGE_CHARS;

/// Appended to script sources cut to fit a single message.
const TRUNCATED_MARKER: &str = "\n... [truncated]";

/// One chat message sent in response to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Help(String),
    DirectMessagesDisabled,

    PingSending,
    Online,
    Offline,

    AlreadyOnline,
    WakeSent,
    WakeFailed,
    NowOnline,
    StillOfflineAfterWake,

    ShutdownSending,
    ShuttingDown,
    ShutdownFailed,
    ShutdownUnreachable,

    RebootSending,
    Rebooting,
    RebootFailed,
    RebootUnreachable,
    BackOnline,
    StillOfflineAfterReboot,

    ScriptsDisabled,
    NoScripts,
    ScriptList(Vec<String>),
    ScriptSource { name: String, body: String },
    ScriptNotFound,
    ScriptRequestFailed(u16),
    ScriptsUnreachable,

    MissingScriptName { prefix: String },
    ShowUsage { prefix: String },
    RunUsage { prefix: String },
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Help(text) => f.write_str(text),
            Self::DirectMessagesDisabled => f.write_str(":x: Direct Messages are disabled."),

            Self::PingSending => f.write_str(":clock2: Sending ping command to the client..."),
            Self::Online => f.write_str(":white_check_mark: Client is online."),
            Self::Offline => f.write_str(
                ":x: An error occurred while sending the ping command. Maybe, the client is offline?",
            ),

            Self::AlreadyOnline => f.write_str(":white_check_mark: Client is already online."),
            Self::WakeSent => f.write_str(":white_check_mark: WOL packet sent successfully."),
            Self::WakeFailed => f.write_str(":x: An error occurred while sending the WOL packet."),
            Self::NowOnline => f.write_str(":white_check_mark: Client is now online."),
            Self::StillOfflineAfterWake => f.write_str(
                ":warning: Client is still offline. Maybe, the wakeup request failed?",
            ),

            Self::ShutdownSending => {
                f.write_str(":clock2: Sending shutdown command to the client...")
            },
            Self::ShuttingDown => f.write_str(":white_check_mark: Client is shutting down..."),
            Self::ShutdownFailed => {
                f.write_str(":x: An error occurred while sending the shutdown command.")
            },
            Self::ShutdownUnreachable => f.write_str(
                ":x: An error occurred while sending the shutdown command. Maybe, the client is already offline?",
            ),

            Self::RebootSending => f.write_str(":clock2: Sending reboot command to the client..."),
            Self::Rebooting => f.write_str(":white_check_mark: Client is rebooting..."),
            Self::RebootFailed => {
                f.write_str(":x: An error occurred while sending the reboot command.")
            },
            Self::RebootUnreachable => f.write_str(
                ":x: An error occurred while sending the reboot command. Maybe, the client is offline?",
            ),
            Self::BackOnline => f.write_str(":white_check_mark: Client is back online."),
            Self::StillOfflineAfterReboot => {
                f.write_str(":warning: Client is still offline. Maybe, the reboot failed?")
            },

            Self::ScriptsDisabled => {
                f.write_str(":x: Scripts are disabled in the client configuration.")
            },
            Self::NoScripts => f.write_str(":x: No scripts found on the client."),
            Self::ScriptList(names) => {
                f.write_str(":white_check_mark: **Available Scripts:**\n")?;
                for name in names {
                    writeln!(f, ":small_blue_diamond: {name}")?;
                }
                Ok(())
            },
            Self::ScriptSource { name, body } => {
                write!(f, ":white_check_mark: **Script *{name}*:**\n```{body}```")
            },
            Self::ScriptNotFound => f.write_str(":x: Script not found."),
            Self::ScriptRequestFailed(status) => write!(
                f,
                ":x: The client answered with an unexpected status ({status})."
            ),
            Self::ScriptsUnreachable => f.write_str(
                ":x: An error occurred while fetching the scripts. Maybe, the client is offline?",
            ),

            Self::MissingScriptName { prefix } => write!(
                f,
                ":x: Please provide a script name. Use *{prefix}scripts* to list all available scripts."
            ),
            Self::ShowUsage { prefix } => write!(
                f,
                ":information_source: Usage: {prefix}scripts show *<script>*"
            ),
            Self::RunUsage { prefix } => {
                write!(f, ":information_source: Usage: {prefix}run *<script>*")
            },
        }
    }
}

impl Reply {
    /// A script source reply that fits one message, cutting the body if needed.
    pub fn script_source(name: &str, body: &str) -> Self {
        let full = Self::ScriptSource {
            name: name.to_string(),
            body: body.to_string(),
        };
        let overflow = full.to_string().chars().count().saturating_sub(MAX_MESSAGE_CHARS);
        if overflow == 0 {
            return full;
        }

        let keep = body
            .chars()
            .count()
            .saturating_sub(overflow + TRUNCATED_MARKER.chars().count());
        let mut cut: String = body.chars().take(keep).collect();
        cut.push_str(TRUNCATED_MARKER);
        Self::ScriptSource {
            name: name.to_string(),
            body: cut,
        }
    }
}

/// Lines appended to a script run's output buffer.
pub mod notice {
    use super::ScriptErrorCode;

    pub fn started(script: &str) -> String {
        format!(":clock2: Running *{script}*...\n")
    }

    /// `None` for blank output, which is never relayed.
    pub fn stdout(line: &str) -> Option<String> {
        tagged(":small_blue_diamond:", line)
    }

    pub fn stderr(line: &str) -> Option<String> {
        tagged(":small_orange_diamond:", line)
    }

    fn tagged(marker: &str, line: &str) -> Option<String> {
        let line = line.trim();
        (!line.is_empty()).then(|| format!("{marker} {line}\n"))
    }

    pub fn exited(script: &str, code: Option<i64>) -> String {
        match code {
            Some(0) => format!(":white_check_mark: Script *{script}* exited with code 0"),
            Some(code) => format!(":warning: Script *{script}* exited with code {code}"),
            None => format!(":warning: Script *{script}* exited without an exit code"),
        }
    }

    pub fn failed(script: &str, code: &ScriptErrorCode) -> String {
        if code.is_not_found() {
            return format!(":x: Script *{script}* not found.\n");
        }
        let mut text =
            format!(":x: An error occurred while running the script. Error Code: {code}\n");
        if code.is_permission_denied() {
            text.push_str(
                ":information_source: The script likely doesn't have execute permissions.\n",
            );
        }
        text
    }

    pub fn not_found(script: &str) -> String {
        format!(":x: Script *{script}* not found.\n")
    }

    pub fn disabled() -> String {
        ":x: Scripts are disabled in the client configuration.\n".into()
    }

    pub fn offline() -> String {
        ":x: An error occurred while running the script. Maybe, the client is offline?\n".into()
    }
}
