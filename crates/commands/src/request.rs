//! Parsing of prefixed chat messages into commands.

use warden_channels::Conversation;

/// A recognised operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Wakeup,
    Shutdown,
    Reboot,
    Ping,
    ListScripts,
    /// `scripts show <name>`; `None` when the name is missing.
    ShowScript(Option<String>),
    /// `run <name>`; `None` when the name is missing.
    RunScript(Option<String>),
}

impl Command {
    /// Interpret the tokens following the prefix. Unknown commands and
    /// unknown `scripts` sub-commands yield `None`.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Option<Self> {
        let arg = |i: usize| args.get(i).map(|s| s.as_ref());
        let command = match arg(0)? {
            "help" => Self::Help,
            "wakeup" => Self::Wakeup,
            "shutdown" => Self::Shutdown,
            "reboot" => Self::Reboot,
            "ping" => Self::Ping,
            "scripts" => match arg(1) {
                None => Self::ListScripts,
                Some("show") => Self::ShowScript(arg(2).map(str::to_string)),
                Some(_) => return None,
            },
            "run" => Self::RunScript(arg(1).map(str::to_string)),
            _ => return None,
        };
        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Wakeup => "wakeup",
            Self::Shutdown => "shutdown",
            Self::Reboot => "reboot",
            Self::Ping => "ping",
            Self::ListScripts => "scripts",
            Self::ShowScript(_) => "scripts show",
            Self::RunScript(_) => "run",
        }
    }
}

/// One inbound command, bound to the conversation it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
    pub conversation: Conversation,
}

impl CommandRequest {
    /// Split `content` into a request if it starts with `prefix`.
    ///
    /// Tokens are separated by runs of spaces; a bare prefix yields an empty
    /// command name.
    pub fn parse(content: &str, prefix: &str, conversation: Conversation) -> Option<Self> {
        let rest = content.strip_prefix(prefix)?;
        let mut tokens = rest
            .trim()
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let name = tokens.next().unwrap_or_default();
        Some(Self {
            name,
            args: tokens.collect(),
            conversation,
        })
    }

    pub fn command(&self) -> Option<Command> {
        let tokens: Vec<&str> = std::iter::once(self.name.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect();
        Command::parse(&tokens)
    }
}
