//! Showdown wire format.
//!
//! Inbound frames look like
//!
//! ```text
//! >roomid
//! |command|argument
//! |command2|argument2
//! ```
//!
//! where the `>roomid` line is optional (global scope when absent) and a line
//! not starting with `|` is a bare notice. Outbound frames are
//! `room|/command argument` or `room|message`.

use crate::identity::RoomId;

/// Room whose id is sent as the empty prefix.
pub const LOBBY_ROOM: &str = "lobby";

/// One parsed protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMessage {
    pub room: RoomId,
    /// Empty for bare notices.
    pub command: String,
    pub argument: String,
}

impl ServerMessage {
    /// Parse a raw frame into the messages it carries, in order.
    ///
    /// An `init` block keeps the whole remainder of the frame as its
    /// argument; any other frame yields one message per non-empty line.
    pub fn parse_frame(frame: &str) -> Vec<ServerMessage> {
        let (room, body) = match frame.strip_prefix('>') {
            Some(rest) => match rest.split_once('\n') {
                Some((room, body)) => (RoomId::new(room.trim_end_matches('\r')), body),
                None => (RoomId::new(rest), ""),
            },
            None => (RoomId::global(), frame),
        };

        if body.starts_with("|init|") {
            return vec![Self::parse_line(room, body)];
        }

        body.split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(|line| Self::parse_line(room.clone(), line))
            .collect()
    }

    fn parse_line(room: RoomId, line: &str) -> ServerMessage {
        match line.strip_prefix('|') {
            Some(rest) => {
                let (command, argument) = rest.split_once('|').unwrap_or((rest, ""));
                ServerMessage {
                    room,
                    command: command.to_string(),
                    argument: argument.to_string(),
                }
            }
            None => ServerMessage {
                room,
                command: String::new(),
                argument: line.to_string(),
            },
        }
    }
}

/// Room prefix used on the wire; the lobby is addressed with an empty prefix.
pub fn room_prefix(room: &RoomId) -> &str {
    if room.as_str() == LOBBY_ROOM {
        ""
    } else {
        room.as_str()
    }
}

/// `room|/command argument`
pub fn command_frame(room: &RoomId, command: &str, argument: &str) -> String {
    format!("{}|/{} {}", room_prefix(room), command, argument)
}

/// `room|message`, escaped once so that it is never read as a command.
///
/// Returns `None` for an empty message.
pub fn chat_frame(room: &RoomId, message: &str) -> Option<String> {
    if message.is_empty() {
        return None;
    }
    Some(format!("{}|{}", room_prefix(room), escape_chat(message)))
}

fn escape_chat(message: &str) -> String {
    if message.starts_with('/') {
        format!("/{}", message)
    } else if message.starts_with('!') || message.starts_with(">> ") || message.starts_with(">>> ")
    {
        format!(" {}", message)
    } else {
        message.to_string()
    }
}
