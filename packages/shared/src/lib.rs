//! Utilities shared by the showdown-irc packages.

pub mod logger;
pub mod time;
