//! Extractors for the HTML boxes Showdown sends through `|raw|` and `|html|`.

use std::sync::LazyLock;

use regex::Regex;
use showdown_irc_client::RoomId;

use crate::render::decode_entities;

const TOPIC_PREFIX: &str = r#"<div class="infobox">The room description is: "#;
const TOPIC_SUFFIX: &str = "</div>";

static WHOIS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"<div class="infobox"><strong class="username">"#,
        r#"<small style="display:none">(.)</small>([^<]+)</strong> "#,
        r#"<br />.*Rooms: (.*)</div>"#,
    ))
    .expect("whois pattern is a valid regex")
});

static WHOIS_ROOM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\w\s]?)<a href="/([^"]+)">"#).expect("room pattern is a valid regex")
});

/// The room description from a `/roomdesc` answer, entities decoded.
pub fn parse_topic(html: &str) -> Option<String> {
    let description = html.strip_prefix(TOPIC_PREFIX)?.strip_suffix(TOPIC_SUFFIX)?;
    Some(decode_entities(description))
}

/// A `/whois` answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whois {
    pub rank: String,
    pub name: String,
    /// Room rank sigil (possibly empty) and room.
    pub rooms: Vec<(String, RoomId)>,
}

pub fn parse_whois(html: &str) -> Option<Whois> {
    let captures = WHOIS_PATTERN.captures(html)?;
    let rooms = WHOIS_ROOM_PATTERN
        .captures_iter(&captures[3])
        .map(|room| (room[1].to_string(), RoomId::new(&room[2])))
        .collect();

    Some(Whois {
        rank: captures[1].to_string(),
        name: captures[2].to_string(),
        rooms,
    })
}
