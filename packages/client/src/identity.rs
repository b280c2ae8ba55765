//! Identity types shared by the protocol layers.
//!
//! Showdown compares users by a canonical id derived from the display name:
//! lowercase ASCII letters and digits only. Two display names that map to the
//! same id denote the same user.

use std::fmt;

/// Rank character used when a roster entry carries no rank sigil.
pub const BLANK_RANK: char = ' ';

/// Canonical user identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UserId(String);

impl UserId {
    /// Derive the identity of a display name (or of a raw id).
    pub fn new(name: &str) -> Self {
        to_id(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase `name` and keep only `[a-z0-9]`.
///
/// Idempotent: `to_id(to_id(x).as_str()) == to_id(x)`.
pub fn to_id(name: &str) -> UserId {
    UserId(
        name.chars()
            .filter_map(|c| {
                let c = c.to_ascii_lowercase();
                c.is_ascii_alphanumeric().then_some(c)
            })
            .collect(),
    )
}

/// Back-end room token. The empty id is the global scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The global (unscoped) room.
    pub fn global() -> Self {
        Self(String::new())
    }

    pub fn is_global(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A roster entry: rank sigil plus display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub rank: char,
    pub name: String,
}

impl User {
    /// Split a raw roster entry such as `@Alice` or ` Bob`.
    ///
    /// The first character is always taken as the rank; an empty entry yields
    /// a blank rank and an empty name.
    pub fn parse(raw: &str) -> Self {
        let mut chars = raw.chars();
        match chars.next() {
            Some(rank) => Self {
                rank,
                name: chars.as_str().to_string(),
            },
            None => Self {
                rank: BLANK_RANK,
                name: String::new(),
            },
        }
    }

    pub fn id(&self) -> UserId {
        to_id(&self.name)
    }

    pub fn has_rank(&self) -> bool {
        self.rank != BLANK_RANK
    }
}
