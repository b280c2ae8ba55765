//! IRC commands understood by the gateway.

/// A recognized IRC command. Anything else is forwarded to Showdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontCommand {
    Cap,
    Pass,
    Nick,
    User,
    Oper,
    Userhost,
    Ping,
    Pong,
    Privmsg,
    Join,
    Part,
    Mode,
    Quit,
}

impl FrontCommand {
    /// Look up an uppercased command name.
    pub fn from_name(name: &str) -> Option<Self> {
        let command = match name {
            "CAP" => Self::Cap,
            "PASS" => Self::Pass,
            "NICK" => Self::Nick,
            "USER" => Self::User,
            "OPER" => Self::Oper,
            "USERHOST" => Self::Userhost,
            "PING" => Self::Ping,
            "PONG" => Self::Pong,
            "PRIVMSG" => Self::Privmsg,
            "JOIN" => Self::Join,
            "PART" => Self::Part,
            "MODE" => Self::Mode,
            "QUIT" => Self::Quit,
            _ => return None,
        };
        Some(command)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cap => "CAP",
            Self::Pass => "PASS",
            Self::Nick => "NICK",
            Self::User => "USER",
            Self::Oper => "OPER",
            Self::Userhost => "USERHOST",
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Privmsg => "PRIVMSG",
            Self::Join => "JOIN",
            Self::Part => "PART",
            Self::Mode => "MODE",
            Self::Quit => "QUIT",
        }
    }

    /// Parameters required before the command can run.
    pub fn min_params(self) -> usize {
        match self {
            Self::User => 4,
            Self::Oper | Self::Privmsg => 2,
            Self::Pass | Self::Nick | Self::Userhost | Self::Join | Self::Part | Self::Mode => 1,
            Self::Cap | Self::Ping | Self::Pong | Self::Quit => 0,
        }
    }

    /// Whether the command talks to Showdown and so needs a session.
    pub fn needs_session(self) -> bool {
        matches!(self, Self::Privmsg | Self::Join | Self::Part)
    }
}

/// The text of a CTCP ACTION (`\x01ACTION text\x01`).
pub fn ctcp_action(text: &str) -> Option<&str> {
    let body = text.strip_prefix("\x01ACTION")?;
    let body = body.strip_suffix('\x01').unwrap_or(body);
    Some(body.strip_prefix(' ').unwrap_or(body))
}

/// Room names from a comma-separated channel list, `#` stripped.
pub fn channel_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',')
        .map(|channel| channel.strip_prefix('#').unwrap_or(channel))
        .filter(|room| !room.is_empty())
}
