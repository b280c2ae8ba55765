//! Showdown events rendered as IRC lines.

use async_trait::async_trait;
use showdown_irc_client::{EventHandler, Room, RoomId, ServerMessage, Session, User, UserId, to_id};
use tokio::sync::watch;

use crate::{
    irc::{
        Numeric,
        names::{SERVER_NAME, escape_user, room_channel, unescape_user, user_mask},
    },
    render::render_html,
    writer::IrcWriter,
};

use super::raw::{parse_topic, parse_whois};

/// 353 lines are flushed before they grow past this many bytes of names.
pub const NAMES_CHUNK_LIMIT: usize = 300;

/// Channel-type character of 353 replies (public channel).
const PUBLIC_CHANNEL: char = '=';

/// Showdown wire commands with an IRC rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendCommand {
    Notice,
    Init,
    Chat,
    TimestampedChat,
    Join,
    Leave,
    Rename,
    PrivateMessage,
    Raw,
    Deinit,
}

impl BackendCommand {
    fn from_command(command: &str) -> Option<Self> {
        let command = match command {
            "" => Self::Notice,
            "init" | "users" => Self::Init,
            "c" | "chat" => Self::Chat,
            "c:" => Self::TimestampedChat,
            "j" | "J" | "join" => Self::Join,
            "l" | "L" | "leave" => Self::Leave,
            "n" | "N" | "name" => Self::Rename,
            "pm" => Self::PrivateMessage,
            "raw" | "html" => Self::Raw,
            "deinit" => Self::Deinit,
            _ => return None,
        };
        Some(command)
    }
}

/// Slash commands that arrive inside chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatCommand {
    Action,
    Announce,
    Html,
    Invite,
}

impl ChatCommand {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "me" | "mee" => Some(Self::Action),
            "announce" => Some(Self::Announce),
            "html" => Some(Self::Html),
            "invite" => Some(Self::Invite),
            _ => None,
        }
    }
}

/// IRC channel mode letter for a Showdown rank sigil.
pub fn rank_mode(rank: char) -> Option<char> {
    match rank {
        '~' => Some('q'),
        '#' => Some('r'),
        '&' => Some('a'),
        '@' => Some('o'),
        '%' => Some('h'),
        '+' => Some('v'),
        _ => None,
    }
}

type RawParser = fn(&Translator, &str, &RoomId) -> bool;

/// Tried in order until one accepts the message.
const RAW_PARSERS: [RawParser; 3] = [
    Translator::raw_topic,
    Translator::raw_whois,
    Translator::raw_generic,
];

/// Translates Showdown events for one IRC client.
///
/// Runs on the session's dispatcher task, after the room state was updated
/// for the same message.
pub struct Translator {
    writer: IrcWriter,
    local: UserId,
    shutdown: watch::Sender<bool>,
}

impl Translator {
    /// # Arguments
    ///
    /// * `writer` - output for the IRC client, carrying its registered nickname
    /// * `shutdown` - set when the Showdown connection is lost
    pub fn new(writer: IrcWriter, shutdown: watch::Sender<bool>) -> Self {
        let local = to_id(&unescape_user(writer.nickname()));
        Self {
            writer,
            local,
            shutdown,
        }
    }

    async fn translate(
        &self,
        message: &ServerMessage,
        room: &Room,
        departed: Option<&User>,
        session: &Session,
    ) {
        let Some(command) = BackendCommand::from_command(&message.command) else {
            tracing::trace!("No IRC rendering for '{}'", message.command);
            return;
        };
        let argument = message.argument.as_str();
        let channel = room_channel(&message.room);

        match command {
            BackendCommand::Notice => {
                if !argument.is_empty() {
                    self.writer.notice(&channel, argument);
                }
            }
            BackendCommand::Init => {
                if let Err(e) = session.send_to_room("roomdesc", "", &message.room).await {
                    tracing::warn!("Failed to request the topic of '{}': {}", channel, e);
                }
                self.writer
                    .send(&[self.writer.nickname(), "JOIN", channel.as_str()]);
                self.send_names(&channel, room);
            }
            BackendCommand::Chat => {
                if let Some((author, text)) = argument.split_once('|') {
                    self.chat(&User::parse(author), &channel, text);
                }
            }
            BackendCommand::TimestampedChat => {
                let mut parts = argument.splitn(3, '|');
                if let (Some(_), Some(author), Some(text)) =
                    (parts.next(), parts.next(), parts.next())
                {
                    self.chat(&User::parse(author), &channel, text);
                }
            }
            BackendCommand::Join => {
                let user = User::parse(argument);
                self.writer
                    .send(&[user_mask(&user.name).as_str(), "JOIN", channel.as_str()]);
                if let Some(mode) = rank_mode(user.rank) {
                    self.send_mode(&channel, '+', mode, &user.name);
                }
            }
            BackendCommand::Leave => {
                let user = departed.cloned().unwrap_or_else(|| User::parse(argument));
                self.writer
                    .send(&[user_mask(&user.name).as_str(), "PART", channel.as_str(), ""]);
            }
            BackendCommand::Rename => {
                let Some((new_raw, old_id)) = argument.split_once('|') else {
                    return;
                };
                let new = User::parse(new_raw);
                let old = departed.cloned().unwrap_or_else(|| User {
                    rank: new.rank,
                    name: old_id.to_string(),
                });
                self.rename(&channel, &old, &new);
            }
            BackendCommand::PrivateMessage => {
                let mut parts = argument.splitn(3, '|');
                if let (Some(from), Some(_), Some(text)) =
                    (parts.next(), parts.next(), parts.next())
                {
                    self.chat(&User::parse(from), self.writer.nickname(), text);
                }
            }
            BackendCommand::Raw => {
                for parser in RAW_PARSERS {
                    if parser(self, argument, &message.room) {
                        break;
                    }
                }
            }
            BackendCommand::Deinit => {
                self.writer
                    .send(&[self.writer.nickname(), "PART", channel.as_str()]);
            }
        }
    }

    /// 353 replies in chunks, then 366.
    fn send_names(&self, channel: &str, room: &Room) {
        let mut names = String::new();
        for user in room.sorted_users() {
            let mut entry = String::new();
            if user.has_rank() {
                entry.push(user.rank);
            }
            entry.push_str(&escape_user(&user.name));

            if !names.is_empty() && names.len() + 1 + entry.len() > NAMES_CHUNK_LIMIT {
                self.writer
                    .numeric(Numeric::RplNamesReply, &[&PUBLIC_CHANNEL, &channel, &names]);
                names.clear();
            }
            if !names.is_empty() {
                names.push(' ');
            }
            names.push_str(&entry);
        }
        if !names.is_empty() {
            self.writer
                .numeric(Numeric::RplNamesReply, &[&PUBLIC_CHANNEL, &channel, &names]);
        }
        self.writer.numeric(Numeric::RplEndOfNames, &[&channel]);
    }

    /// Deliver a chat line from `author` to `target`.
    fn chat(&self, author: &User, target: &str, text: &str) {
        if author.id() == self.local {
            return;
        }
        let mask = user_mask(&author.name);

        if let Some(escaped) = text.strip_prefix("//") {
            let unescaped = format!("/{}", escaped);
            self.writer
                .send(&[mask.as_str(), "PRIVMSG", target, unescaped.as_str()]);
            return;
        }

        let Some(command_line) = text.strip_prefix('/') else {
            self.writer.send(&[mask.as_str(), "PRIVMSG", target, text]);
            return;
        };
        let (name, argument) = command_line.split_once(' ').unwrap_or((command_line, ""));

        match ChatCommand::from_name(name) {
            Some(ChatCommand::Action) => {
                let action = format!("\x01ACTION {}\x01", argument);
                self.writer
                    .send(&[mask.as_str(), "PRIVMSG", target, action.as_str()]);
            }
            Some(ChatCommand::Announce) => {
                self.writer.send(&[mask.as_str(), "NOTICE", target, argument]);
            }
            Some(ChatCommand::Html) => {
                for line in render_html(argument) {
                    self.writer
                        .send(&[mask.as_str(), "NOTICE", target, line.as_str()]);
                }
            }
            Some(ChatCommand::Invite) => {
                let channel = room_channel(&RoomId::new(argument.trim()));
                self.writer
                    .send(&[mask.as_str(), "INVITE", self.writer.nickname(), channel.as_str()]);
            }
            None => self.writer.send(&[mask.as_str(), "PRIVMSG", target, text]),
        }
    }

    fn rename(&self, channel: &str, old: &User, new: &User) {
        let new_nickname = escape_user(&new.name);
        if escape_user(&old.name) != new_nickname {
            self.writer
                .send(&[user_mask(&old.name).as_str(), "NICK", new_nickname.as_str()]);
        }

        let old_mode = rank_mode(old.rank);
        let new_mode = rank_mode(new.rank);
        if old_mode == new_mode {
            return;
        }
        if let Some(mode) = old_mode {
            self.send_mode(channel, '-', mode, &new.name);
        }
        if let Some(mode) = new_mode {
            self.send_mode(channel, '+', mode, &new.name);
        }
    }

    fn send_mode(&self, channel: &str, sign: char, mode: char, name: &str) {
        let change = format!("{}{}", sign, mode);
        let nickname = escape_user(name);
        self.writer
            .send_global(&["MODE", channel, change.as_str(), nickname.as_str()]);
    }

    fn raw_topic(&self, html: &str, room: &RoomId) -> bool {
        let Some(topic) = parse_topic(html) else {
            return false;
        };
        self.writer
            .numeric(Numeric::RplTopic, &[&room_channel(room), &topic]);
        true
    }

    fn raw_whois(&self, html: &str, _room: &RoomId) -> bool {
        let Some(whois) = parse_whois(html) else {
            return false;
        };
        let nickname = escape_user(&whois.name);
        let id = to_id(&whois.name);
        let rank = format!("Global rank: {}", whois.rank);
        self.writer.numeric(
            Numeric::RplWhoisUser,
            &[&nickname, &id, &SERVER_NAME, &rank],
        );

        // Every entry is followed by a space, the last one included.
        let rooms: String = whois
            .rooms
            .iter()
            .map(|(rank, room)| format!("{}{} ", rank, room_channel(room)))
            .collect();
        self.writer
            .numeric(Numeric::RplWhoisChannels, &[&nickname, &rooms]);
        self.writer.numeric(Numeric::RplEndOfWhois, &[&nickname]);
        true
    }

    fn raw_generic(&self, html: &str, room: &RoomId) -> bool {
        let channel = room_channel(room);
        for line in render_html(html) {
            self.writer.notice(&channel, &line);
        }
        true
    }
}

#[async_trait]
impl EventHandler for Translator {
    async fn on_message(
        &mut self,
        message: &ServerMessage,
        room: &Room,
        departed: Option<&User>,
        session: &Session,
    ) {
        self.translate(message, room, departed, session).await;
    }

    async fn on_disconnect(&mut self, session: &Session) {
        if !session.is_closing() {
            tracing::warn!("Showdown connection of '{}' lost", self.writer.nickname());
            self.writer.notice("#", "Disconnected from Showdown");
        }
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showdown_irc_client::{FrameSink, TransportError};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct RecordingSink {
        frames: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send_text(&self, frame: String) -> Result<(), TransportError> {
            let _ = self.frames.send(frame);
            Ok(())
        }

        async fn close(&self) {}
    }

    struct Harness {
        translator: Translator,
        session: Session,
        lines: mpsc::UnboundedReceiver<String>,
        frames: mpsc::UnboundedReceiver<String>,
        shutdown: watch::Receiver<bool>,
    }

    impl Harness {
        fn new() -> Self {
            let (lines_tx, lines) = mpsc::unbounded_channel();
            let (frames_tx, frames) = mpsc::unbounded_channel();
            let (shutdown_tx, shutdown) = watch::channel(false);
            let mut writer = IrcWriter::new(lines_tx);
            writer.set_nickname("Me\u{a0}Myself");
            Self {
                translator: Translator::new(writer, shutdown_tx),
                session: Session::new(Arc::new(RecordingSink { frames: frames_tx })),
                lines,
                frames,
                shutdown,
            }
        }

        async fn feed(&mut self, room: &Room, command: &str, argument: &str, departed: Option<&User>) {
            let message = ServerMessage {
                room: room.id.clone(),
                command: command.to_string(),
                argument: argument.to_string(),
            };
            self.translator
                .on_message(&message, room, departed, &self.session)
                .await;
        }

        fn lines(&mut self) -> Vec<String> {
            let mut lines = Vec::new();
            while let Ok(line) = self.lines.try_recv() {
                lines.push(line);
            }
            lines
        }
    }

    fn room(id: &str) -> Room {
        Room::new(RoomId::new(id))
    }

    #[tokio::test]
    async fn test_init_requests_topic_and_lists_names() {
        // テスト項目: init でトピックを要求し、JOIN、NAMES 一覧、終端を送る
        // given (前提条件):
        let mut harness = Harness::new();
        let mut help = room("help");
        help.apply_full_roster("3,@Bob, Alice Smith,+Carol");

        // when (操作):
        harness.feed(&help, "init", "chat", None).await;

        // then (期待する結果):
        assert_eq!(harness.frames.try_recv().unwrap(), "help|/roomdesc ");
        assert_eq!(
            harness.lines(),
            vec![
                ":Me\u{a0}Myself JOIN #help\r\n",
                ":showdown 353 Me\u{a0}Myself = #help :Alice\u{a0}Smith @Bob +Carol\r\n",
                ":showdown 366 Me\u{a0}Myself #help :End of /NAMES list\r\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_names_are_chunked() {
        // テスト項目: NAMES 一覧は上限を超える前に分割される
        // given (前提条件):
        let mut harness = Harness::new();
        let mut lobby = room("lobby");
        let roster: Vec<String> = (0..100).map(|i| format!(" user{:03}", i)).collect();
        lobby.apply_full_roster(&format!("100,{}", roster.join(",")));

        // when (操作):
        harness.feed(&lobby, "users", "", None).await;

        // then (期待する結果):
        let lines = harness.lines();
        let names: Vec<&String> = lines.iter().filter(|line| line.contains(" 353 ")).collect();
        assert!(names.len() > 1);
        for line in &names {
            let (_, listed) = line.trim_end().split_once(" :").unwrap();
            assert!(listed.len() <= NAMES_CHUNK_LIMIT);
        }
        let total: usize = names
            .iter()
            .map(|line| line.trim_end().split_once(" :").unwrap().1.split(' ').count())
            .sum();
        assert_eq!(total, 100);
        assert!(lines.last().unwrap().contains(" 366 "));
    }

    #[tokio::test]
    async fn test_chat_from_others_becomes_privmsg() {
        // テスト項目: 他のユーザーの発言は PRIVMSG として届く
        // given (前提条件):
        let mut harness = Harness::new();
        let lobby = room("lobby");

        // when (操作):
        harness
            .feed(&lobby, "c:", "1700000000|+Bob|hello: world|with pipe", None)
            .await;

        // then (期待する結果):
        assert_eq!(
            harness.lines(),
            vec![":Bob!bob@showdown PRIVMSG #lobby :hello: world|with pipe\r\n"]
        );
    }

    #[tokio::test]
    async fn test_own_chat_is_not_echoed() {
        // テスト項目: 自分の発言はエコーされない
        // given (前提条件):
        let mut harness = Harness::new();
        let lobby = room("lobby");

        // when (操作):
        harness.feed(&lobby, "c", " Me Myself|hi", None).await;
        harness
            .feed(&lobby, "pm", " Me Myself| Bob|psst", None)
            .await;

        // then (期待する結果):
        assert!(harness.lines().is_empty());
    }

    #[tokio::test]
    async fn test_chat_commands() {
        // テスト項目: 発言中のコマンドがアクション、告知、HTML、招待に変換され、未知のものはそのまま届く
        // given (前提条件):
        let mut harness = Harness::new();
        let lobby = room("lobby");

        // when (操作):
        harness.feed(&lobby, "c", " Bob|/me waves", None).await;
        harness.feed(&lobby, "c", " Bob|/announce Tour soon", None).await;
        harness
            .feed(&lobby, "c", " Bob|/html <b>bold</b> move", None)
            .await;
        harness.feed(&lobby, "c", " Bob|/invite techcode", None).await;
        harness.feed(&lobby, "c", " Bob|/unknown thing", None).await;
        harness.feed(&lobby, "c", " Bob|//slashes", None).await;

        // then (期待する結果):
        assert_eq!(
            harness.lines(),
            vec![
                ":Bob!bob@showdown PRIVMSG #lobby :\x01ACTION waves\x01\r\n",
                ":Bob!bob@showdown NOTICE #lobby :Tour soon\r\n",
                ":Bob!bob@showdown NOTICE #lobby :\x02bold\x02 move\r\n",
                ":Bob!bob@showdown INVITE Me\u{a0}Myself #techcode\r\n",
                ":Bob!bob@showdown PRIVMSG #lobby :/unknown thing\r\n",
                ":Bob!bob@showdown PRIVMSG #lobby /slashes\r\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_private_message_targets_local_nickname() {
        // テスト項目: 個人メッセージは自分のニックネーム宛ての PRIVMSG になる
        // given (前提条件):
        let mut harness = Harness::new();
        let global = room("");

        // when (操作):
        harness
            .feed(&global, "pm", " Bob Jones| Me Myself|hi there", None)
            .await;

        // then (期待する結果):
        assert_eq!(
            harness.lines(),
            vec![":Bob\u{a0}Jones!bobjones@showdown PRIVMSG Me\u{a0}Myself :hi there\r\n"]
        );
    }

    #[tokio::test]
    async fn test_join_with_rank_sets_mode() {
        // テスト項目: ランク付きの参加は JOIN と MODE になる
        // given (前提条件):
        let mut harness = Harness::new();
        let help = room("help");

        // when (操作):
        harness.feed(&help, "j", "@Bob", None).await;
        harness.feed(&help, "J", " Carol", None).await;

        // then (期待する結果):
        assert_eq!(
            harness.lines(),
            vec![
                ":Bob!bob@showdown JOIN #help\r\n",
                ":showdown MODE #help +o Bob\r\n",
                ":Carol!carol@showdown JOIN #help\r\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_leave_uses_departed_name() {
        // テスト項目: 退出は保存されていた表示名のマスクで PART になる
        // given (前提条件):
        let mut harness = Harness::new();
        let help = room("help");
        let departed = User::parse("@Bob Jones");

        // when (操作):
        harness.feed(&help, "l", "bobjones", Some(&departed)).await;

        // then (期待する結果):
        assert_eq!(
            harness.lines(),
            vec![":Bob\u{a0}Jones!bobjones@showdown PART #help :\r\n"]
        );
    }

    #[tokio::test]
    async fn test_rename_changes_nick_and_mode() {
        // テスト項目: 名前変更は NICK と、ランクが変わった場合の MODE になる
        // given (前提条件):
        let mut harness = Harness::new();
        let help = room("help");
        let departed = User::parse("+Alice");

        // when (操作):
        harness.feed(&help, "n", "@Alice2|alice", Some(&departed)).await;

        // then (期待する結果):
        assert_eq!(
            harness.lines(),
            vec![
                ":Alice!alice@showdown NICK Alice2\r\n",
                ":showdown MODE #help -v Alice2\r\n",
                ":showdown MODE #help +o Alice2\r\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_raw_topic_whois_and_generic() {
        // テスト項目: raw メッセージはトピック、whois、汎用 HTML の順に解釈される
        // given (前提条件):
        let mut harness = Harness::new();
        let help = room("help");
        let whois = concat!(
            r#"<div class="infobox"><strong class="username">"#,
            r#"<small style="display:none"> </small>Bob</strong> "#,
            r#"<br />Rooms: @<a href="/help">help</a></div>"#,
        );

        // when (操作):
        harness
            .feed(
                &help,
                "raw",
                r#"<div class="infobox">The room description is: Q&amp;A</div>"#,
                None,
            )
            .await;
        harness.feed(&help, "raw", whois, None).await;
        harness
            .feed(&help, "html", "<div>line one</div><div>line two</div>", None)
            .await;

        // then (期待する結果):
        assert_eq!(
            harness.lines(),
            vec![
                ":showdown 332 Me\u{a0}Myself #help :Q&A\r\n",
                ":showdown 311 Me\u{a0}Myself Bob bob showdown * :Global rank:  \r\n",
                ":showdown 319 Me\u{a0}Myself Bob :@#help \r\n",
                ":showdown 318 Me\u{a0}Myself Bob :End of /WHOIS list\r\n",
                ":showdown NOTICE #help :line one\r\n",
                ":showdown NOTICE #help :line two\r\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_notice_and_deinit() {
        // テスト項目: コマンドのない行は NOTICE に、deinit は自分の PART になる
        // given (前提条件):
        let mut harness = Harness::new();
        let global = room("");
        let help = room("help");

        // when (操作):
        harness.feed(&global, "", "Server restarting soon", None).await;
        harness.feed(&help, "deinit", "", None).await;

        // then (期待する結果):
        assert_eq!(
            harness.lines(),
            vec![
                ":showdown NOTICE #lobby :Server restarting soon\r\n",
                ":Me\u{a0}Myself PART #help\r\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_unexpected_disconnect_notifies_and_signals_shutdown() {
        // テスト項目: 要求していない切断は NOTICE を送り、接続の終了を通知する
        // given (前提条件):
        let mut harness = Harness::new();

        // when (操作):
        let session = harness.session.clone();
        harness.translator.on_disconnect(&session).await;

        // then (期待する結果):
        assert_eq!(
            harness.lines(),
            vec![":showdown NOTICE # :Disconnected from Showdown\r\n"]
        );
        assert!(*harness.shutdown.borrow());
    }

    #[tokio::test]
    async fn test_requested_disconnect_is_silent() {
        // テスト項目: クライアントが要求した切断では NOTICE を送らない
        // given (前提条件):
        let mut harness = Harness::new();
        harness.session.close().await;

        // when (操作):
        let session = harness.session.clone();
        harness.translator.on_disconnect(&session).await;

        // then (期待する結果):
        assert!(harness.lines().is_empty());
        assert!(*harness.shutdown.borrow());
    }
}
