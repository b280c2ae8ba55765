//! Mapping Showdown names to IRC nicknames, masks and channels.
//!
//! Showdown display names may contain spaces, which IRC nicknames cannot.
//! Spaces are replaced with U+00A0 on the way out and restored on the way in.

use showdown_irc_client::{RoomId, to_id};

/// Server name used as the prefix of gateway-originated lines.
pub const SERVER_NAME: &str = "showdown";

/// Channel shown for the global scope.
pub const LOBBY_CHANNEL: &str = "#lobby";

const NO_BREAK_SPACE: char = '\u{a0}';

pub fn escape_user(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_whitespace() { NO_BREAK_SPACE } else { c })
        .collect()
}

pub fn unescape_user(name: &str) -> String {
    name.replace(NO_BREAK_SPACE, " ")
}

/// Whether `name` can be sent as a middle parameter: non-empty and not
/// starting with `:`.
pub fn valid_nickname(name: &str) -> bool {
    !name.is_empty() && !name.starts_with(':')
}

/// Synthetic `nick!id@showdown` mask. Some IRC clients expect a host in
/// JOIN and PART lines.
pub fn user_mask(name: &str) -> String {
    format!("{}!{}@{}", escape_user(name), to_id(name), SERVER_NAME)
}

pub fn room_channel(room: &RoomId) -> String {
    if room.is_global() {
        LOBBY_CHANNEL.to_string()
    } else {
        format!("#{}", room)
    }
}

/// The room behind a `#channel` name, `None` for anything else.
pub fn channel_room(channel: &str) -> Option<RoomId> {
    channel.strip_prefix('#').map(RoomId::new)
}
