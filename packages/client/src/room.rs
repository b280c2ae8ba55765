//! Per-room roster state.
//!
//! Rooms are owned by the session's dispatcher task and only mutated there,
//! so no locking is needed.

use std::collections::HashMap;

use crate::identity::{RoomId, User, UserId};

/// A chat room and the users currently in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub title: String,
    pub users: HashMap<UserId, User>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            title: String::new(),
            users: HashMap::new(),
        }
    }

    /// Replace the roster with a comma-separated list whose first entry is a
    /// count and is discarded, e.g. `3,@Alice, Bob,+Carol`.
    pub fn apply_full_roster(&mut self, raw: &str) {
        self.users = raw
            .split(',')
            .skip(1)
            .map(User::parse)
            .map(|user| (user.id(), user))
            .collect();
    }

    /// Insert or overwrite a user from a raw roster entry.
    pub fn apply_join(&mut self, raw: &str) {
        let user = User::parse(raw);
        self.users.insert(user.id(), user);
    }

    /// Remove a user. The raw entry is reduced to its identity, so a leading
    /// rank sigil is irrelevant.
    pub fn apply_leave(&mut self, raw: &str) -> Option<User> {
        self.users.remove(&UserId::new(raw))
    }

    /// Remove `old_id` and insert the user described by `new_raw`.
    pub fn apply_rename(&mut self, new_raw: &str, old_id: &UserId) -> Option<User> {
        let previous = self.users.remove(old_id);
        self.apply_join(new_raw);
        previous
    }

    /// Apply an init block: `|title|` sets the title and `|users|` the roster.
    pub fn apply_init(&mut self, block: &str) {
        for line in block.lines() {
            if let Some(title) = line.strip_prefix("|title|") {
                self.title = title.to_string();
            } else if let Some(users) = line.strip_prefix("|users|") {
                self.apply_full_roster(users);
            }
        }
    }

    /// Users sorted by identity.
    pub fn sorted_users(&self) -> Vec<&User> {
        let mut users: Vec<(&UserId, &User)> = self.users.iter().collect();
        users.sort_by(|a, b| a.0.cmp(b.0));
        users.into_iter().map(|(_, user)| user).collect()
    }
}
