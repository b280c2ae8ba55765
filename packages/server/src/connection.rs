//! One IRC client and its Showdown session.
//!
//! The read loop parses client lines and answers most of them locally. Once
//! both NICK and USER arrived, a session is opened through the
//! [`SessionFactory`] and everything Showdown says flows back through the
//! session's [`Translator`]. The connection ends on QUIT, on EOF, on a failed
//! login, or when the translator reports that Showdown went away.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use showdown_irc_client::{LoginData, RoomId, Session, SessionError};
use showdown_irc_shared::time::{get_utc_timestamp, timestamp_to_utc_display};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader},
    sync::{mpsc, watch},
};

use crate::{
    config::GatewayConfig,
    connector::SessionFactory,
    irc::{
        Numeric,
        line::tokenize,
        names::{
            SERVER_NAME, channel_room, escape_user, unescape_user, user_mask, valid_nickname,
        },
    },
    translate::{
        FrontCommand, Translator,
        frontend::{channel_list, ctcp_action},
    },
    writer::{IrcWriter, spawn_writer},
};

const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
const USER_MODES: &str = "o";
const CHANNEL_MODES: &str = "ntcqraohv";
const CHANNEL_MODE_REPLY: &str = "+ntc";
const ISUPPORT_PREFIX: &str = "PREFIX=(qraohv)~#&@%+";
const NICKSERV: &str = "NickServ";

/// Shared by every connection of a gateway.
pub struct GatewayContext {
    pub sessions: Arc<dyn SessionFactory>,
    pub autojoin: Vec<String>,
    pub login_timeout: Duration,
    /// Start time shown in the welcome burst
    pub created: String,
}

impl GatewayContext {
    pub fn new(config: &GatewayConfig, sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            sessions,
            autojoin: config.autojoin.clone(),
            login_timeout: config.login_timeout,
            created: timestamp_to_utc_display(get_utc_timestamp()),
        }
    }
}

enum LoginOutcome {
    Succeeded,
    Failed(String),
    Disconnected,
}

type LoginWait = Pin<Box<dyn Future<Output = LoginOutcome> + Send + Sync>>;

enum ReadEvent {
    Read(std::io::Result<usize>),
    Login(LoginOutcome),
    Shutdown,
}

/// Resolves with the login result, or never while no login is pending.
async fn login_outcome(wait: &mut Option<LoginWait>) -> LoginOutcome {
    match wait {
        Some(wait) => wait.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Serve one IRC client until it quits or its Showdown session ends.
///
/// # Arguments
///
/// * `stream` - the client socket
/// * `context` - settings and the session factory shared with other clients
pub async fn serve_connection<S>(stream: S, context: Arc<GatewayContext>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (tx, rx) = mpsc::unbounded_channel();
    let mut writer_task = spawn_writer(rx, write_half);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let mut connection = Connection::new(IrcWriter::new(tx), context, shutdown_tx);
    let mut reader = BufReader::new(read_half);
    let mut buffer = Vec::new();

    while !connection.closing {
        buffer.clear();
        let event = tokio::select! {
            read = reader.read_until(b'\n', &mut buffer) => ReadEvent::Read(read),
            outcome = login_outcome(&mut connection.login_wait) => ReadEvent::Login(outcome),
            _ = shutdown_rx.changed() => ReadEvent::Shutdown,
        };

        match event {
            ReadEvent::Read(Ok(0)) => {
                tracing::info!("IRC client closed the connection");
                break;
            }
            ReadEvent::Read(Ok(_)) => {
                let line = String::from_utf8_lossy(&buffer).into_owned();
                connection.handle_line(&line).await;
            }
            ReadEvent::Read(Err(e)) => {
                tracing::warn!("Failed to read from IRC client: {}", e);
                break;
            }
            ReadEvent::Login(outcome) => connection.logged_in(outcome).await,
            ReadEvent::Shutdown => {
                tracing::info!("Showdown session ended, closing IRC connection");
                break;
            }
        }
    }

    connection.close().await;
    drop(connection);

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer_task)
        .await
        .is_err()
    {
        tracing::debug!("IRC writer did not drain in time");
        writer_task.abort();
    }
}

struct Connection {
    writer: IrcWriter,
    context: Arc<GatewayContext>,
    shutdown: watch::Sender<bool>,
    login: LoginData,
    requested_nickname: Option<String>,
    nick_seen: bool,
    user_seen: bool,
    session: Option<Session>,
    /// Set between opening the session and the end of login
    login_wait: Option<LoginWait>,
    closing: bool,
}

impl Connection {
    fn new(writer: IrcWriter, context: Arc<GatewayContext>, shutdown: watch::Sender<bool>) -> Self {
        let login = LoginData {
            rooms: context.autojoin.clone(),
            ..LoginData::default()
        };
        Self {
            writer,
            context,
            shutdown,
            login,
            requested_nickname: None,
            nick_seen: false,
            user_seen: false,
            session: None,
            login_wait: None,
            closing: false,
        }
    }

    async fn handle_line(&mut self, line: &str) {
        let tokens = tokenize(line);
        let Some((name, params)) = tokens.split_first() else {
            return;
        };
        tracing::debug!("IRC -> {:?}", tokens);

        let name = name.to_ascii_uppercase();
        match FrontCommand::from_name(&name) {
            Some(command) => self.run(command, params).await,
            None => self.forward(&name, params).await,
        }
    }

    async fn run(&mut self, command: FrontCommand, params: &[String]) {
        if params.len() < command.min_params() {
            self.writer
                .numeric(Numeric::ErrNeedMoreParams, &[&command.name()]);
            return;
        }
        if command.needs_session() && !self.registered() {
            self.writer.numeric(Numeric::ErrNotRegistered, &[]);
            return;
        }

        match command {
            FrontCommand::Cap | FrontCommand::Pong => {}
            FrontCommand::Pass => {
                if self.nick_seen || self.user_seen {
                    self.writer.numeric(Numeric::ErrAlreadyRegistered, &[]);
                } else {
                    self.login.password = params[0].clone();
                }
            }
            FrontCommand::Nick => self.nick(&params[0]).await,
            FrontCommand::User => self.user(&params[3]).await,
            FrontCommand::Oper => self.writer.numeric(Numeric::ErrNoOperHost, &[]),
            FrontCommand::Userhost => {
                for nickname in params {
                    let mask = user_mask(&unescape_user(nickname));
                    self.writer.numeric(Numeric::RplUserhost, &[&mask]);
                }
            }
            FrontCommand::Ping => {
                let mut tokens = vec!["PONG", SERVER_NAME];
                tokens.extend(params.iter().map(String::as_str));
                self.writer.send_global(&tokens);
            }
            FrontCommand::Privmsg => self.privmsg(&params[0], &params[1]).await,
            FrontCommand::Join => {
                for room in channel_list(&params[0]) {
                    self.to_global("join", room).await;
                }
            }
            FrontCommand::Part => {
                for room in channel_list(&params[0]) {
                    self.to_room("part", "", &RoomId::new(room)).await;
                }
            }
            FrontCommand::Mode => {
                if params.len() == 1 {
                    self.writer.numeric(
                        Numeric::RplChannelModeIs,
                        &[&params[0], &CHANNEL_MODE_REPLY, &""],
                    );
                }
            }
            FrontCommand::Quit => self.close().await,
        }
    }

    /// Commands the gateway does not know go to Showdown as `/command`.
    async fn forward(&mut self, name: &str, params: &[String]) {
        if !self.registered() {
            self.writer.numeric(Numeric::ErrNotRegistered, &[]);
            return;
        }

        let command = name.to_lowercase();
        match params.first().and_then(|first| channel_room(first)) {
            Some(room) => {
                self.to_room(&command, &params[1..].join(" "), &room).await;
            }
            None => self.to_global(&command, &params.join(" ")).await,
        }
    }

    async fn nick(&mut self, nickname: &str) {
        if self.nick_seen && self.user_seen {
            tracing::debug!("Nickname change to '{}' ignored", nickname);
            return;
        }
        if !valid_nickname(nickname) {
            self.writer
                .numeric(Numeric::ErrErroneusNickname, &[&nickname]);
            return;
        }
        self.requested_nickname = Some(nickname.to_string());
        self.nick_seen = true;
        if self.user_seen {
            self.establish_session().await;
        }
    }

    async fn user(&mut self, realname: &str) {
        if self.user_seen {
            self.writer.numeric(Numeric::ErrAlreadyRegistered, &[]);
            return;
        }
        if !realname.is_empty() && !valid_nickname(realname) {
            self.writer
                .numeric(Numeric::ErrErroneusNickname, &[&realname]);
            return;
        }
        self.user_seen = true;
        if !realname.is_empty() {
            self.login.nickname = realname.to_string();
            self.writer.set_nickname(escape_user(realname));
        }
        if self.nick_seen {
            self.establish_session().await;
        }
    }

    async fn privmsg(&mut self, target: &str, text: &str) {
        if let Some(room) = channel_room(target) {
            let text = unescape_user(text);
            match ctcp_action(&text) {
                Some(action) => self.to_room("me", action, &room).await,
                None => {
                    if let Some(session) = &self.session {
                        report(session.say(&text, &room).await);
                    }
                }
            }
        } else if target.eq_ignore_ascii_case(NICKSERV) {
            tracing::debug!("Message to {} dropped", NICKSERV);
        } else {
            let text = match ctcp_action(text) {
                Some(action) => format!("/me {}", action),
                None => text.to_string(),
            };
            let argument = format!("{},{}", unescape_user(target), text);
            self.to_global("pm", &argument).await;
        }
    }

    async fn to_global(&self, command: &str, argument: &str) {
        if let Some(session) = &self.session {
            report(session.send_global(command, argument).await);
        }
    }

    async fn to_room(&self, command: &str, argument: &str, room: &RoomId) {
        if let Some(session) = &self.session {
            report(session.send_to_room(command, argument, room).await);
        }
    }

    async fn establish_session(&mut self) {
        if self.login.nickname.is_empty() {
            let requested = self.requested_nickname.clone().unwrap_or_default();
            self.login.nickname = unescape_user(&requested);
        }
        self.writer.set_nickname(escape_user(&self.login.nickname));

        let login = std::mem::take(&mut self.login);
        tracing::info!("Logging in to Showdown as '{}'", login.nickname);
        let translator = Translator::new(self.writer.clone(), self.shutdown.clone());

        let opened = self.context.sessions.open(login, translator).await;
        let (session, logged_in) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                self.fail(&e.to_string()).await;
                return;
            }
        };
        self.session = Some(session);

        let login_timeout = self.context.login_timeout;
        self.login_wait = Some(Box::pin(async move {
            match tokio::time::timeout(login_timeout, logged_in).await {
                Ok(Ok(Ok(()))) => LoginOutcome::Succeeded,
                Ok(Ok(Err(e))) => LoginOutcome::Failed(e.to_string()),
                Ok(Err(_)) => LoginOutcome::Disconnected,
                Err(_) => LoginOutcome::Failed(format!(
                    "Authentication did not succeed in {:?}",
                    login_timeout
                )),
            }
        }));
    }

    async fn logged_in(&mut self, outcome: LoginOutcome) {
        self.login_wait = None;
        // The translator already told the client when Showdown went away.
        let announced = *self.shutdown.borrow();
        match outcome {
            LoginOutcome::Succeeded => self.welcome(),
            LoginOutcome::Failed(reason) => self.fail(&reason).await,
            LoginOutcome::Disconnected if announced => self.close().await,
            LoginOutcome::Disconnected => {
                self.fail("Disconnected from Showdown before logging in")
                    .await
            }
        }
    }

    /// Whether the session is open and logged in.
    fn registered(&self) -> bool {
        self.session.is_some() && self.login_wait.is_none()
    }

    async fn fail(&mut self, reason: &str) {
        tracing::warn!("Session of '{}' failed: {}", self.writer.nickname(), reason);
        self.writer.notice("#", reason);
        self.close().await;
    }

    fn welcome(&self) {
        let nickname = self.writer.nickname();
        if let Some(requested) = &self.requested_nickname
            && requested != nickname
        {
            self.writer.send(&[requested.as_str(), "NICK", nickname]);
        }

        let version = env!("CARGO_PKG_VERSION");
        let source = format!("Source code: {}", env!("CARGO_PKG_REPOSITORY"));
        self.writer
            .numeric(Numeric::RplWelcome, &[&"Welcome to Showdown proxy!"]);
        self.writer
            .numeric(Numeric::RplYourHost, &[&SERVER_NAME, &version]);
        self.writer
            .numeric(Numeric::RplCreated, &[&self.context.created]);
        self.writer.numeric(
            Numeric::RplMyInfo,
            &[&SERVER_NAME, &version, &USER_MODES, &CHANNEL_MODES],
        );
        self.writer.numeric(Numeric::RplBounce, &[&ISUPPORT_PREFIX]);
        self.writer.numeric(Numeric::RplMotdStart, &[&SERVER_NAME]);
        self.writer.numeric(
            Numeric::RplMotd,
            &[&"This server is a proxy server for Pokémon Showdown."],
        );
        self.writer.numeric(Numeric::RplMotd, &[&source]);
        self.writer.numeric(Numeric::RplEndOfMotd, &[]);
    }

    /// Say goodbye to the client and hang up on Showdown. Runs once.
    async fn close(&mut self) {
        if self.closing {
            return;
        }
        self.closing = true;
        self.writer.send_global(&["QUIT", self.writer.nickname()]);
        if let Some(session) = &self.session {
            session.close().await;
        }
    }
}

fn report(result: Result<(), SessionError>) {
    if let Err(e) = result {
        tracing::warn!("Failed to send to Showdown: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::MockSessionFactory;
    use showdown_irc_client::DiscoveryError;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn context(sessions: MockSessionFactory) -> Arc<GatewayContext> {
        Arc::new(GatewayContext {
            sessions: Arc::new(sessions),
            autojoin: vec!["lobby".to_string()],
            login_timeout: Duration::from_secs(1),
            created: "2026-01-01 00:00:00 UTC".to_string(),
        })
    }

    /// Feed `input` to a fresh connection and collect everything it writes.
    async fn exchange(sessions: MockSessionFactory, input: &str) -> String {
        let (mut client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(serve_connection(server, context(sessions)));

        client.write_all(input.as_bytes()).await.unwrap();
        let mut output = String::new();
        tokio::time::timeout(Duration::from_secs(5), client.read_to_string(&mut output))
            .await
            .unwrap()
            .unwrap();
        task.await.unwrap();
        output
    }

    #[tokio::test]
    async fn test_missing_parameters() {
        // テスト項目: パラメータ不足のコマンドには 461 を返し、接続は続く
        // given (前提条件):
        let sessions = MockSessionFactory::new();

        // when (操作):
        let output = exchange(sessions, "PASS\r\nQUIT\r\n").await;

        // then (期待する結果):
        assert_eq!(
            output,
            ":showdown 461 * PASS :Not enough parameters\r\n:showdown QUIT *\r\n"
        );
    }

    #[tokio::test]
    async fn test_commands_before_registration() {
        // テスト項目: セッションが必要なコマンドは登録前だと 451 になる
        // given (前提条件):
        let sessions = MockSessionFactory::new();

        // when (操作):
        let output = exchange(sessions, "JOIN #help\r\nWHOIS someone\r\nQUIT\r\n").await;

        // then (期待する結果):
        assert_eq!(
            output,
            concat!(
                ":showdown 451 * :You have not registered\r\n",
                ":showdown 451 * :You have not registered\r\n",
                ":showdown QUIT *\r\n",
            )
        );
    }

    #[tokio::test]
    async fn test_local_commands() {
        // テスト項目: PING, OPER, USERHOST, MODE はゲートウェイ内で応答する
        // given (前提条件):
        let sessions = MockSessionFactory::new();
        let input = concat!(
            "PING :irc.example\r\n",
            "OPER admin secret\r\n",
            "USERHOST Alice\u{a0}Smith\r\n",
            "MODE #lobby\r\n",
            "MODE #lobby +o someone\r\n",
            "CAP LS 302\r\n",
            "QUIT\r\n",
        );

        // when (操作):
        let output = exchange(sessions, input).await;

        // then (期待する結果):
        assert_eq!(
            output,
            concat!(
                ":showdown PONG showdown irc.example\r\n",
                ":showdown 491 * :No O-lines for your host\r\n",
                ":showdown 302 * :Alice\u{a0}Smith!alicesmith@showdown\r\n",
                ":showdown 324 * #lobby +ntc \r\n",
                ":showdown QUIT *\r\n",
            )
        );
    }

    #[tokio::test]
    async fn test_pass_after_nick() {
        // テスト項目: NICK の後の PASS は 462 になる
        // given (前提条件):
        let sessions = MockSessionFactory::new();

        // when (操作):
        let output = exchange(sessions, "NICK alice\r\nPASS secret\r\nQUIT\r\n").await;

        // then (期待する結果):
        assert_eq!(
            output,
            ":showdown 462 * :You may not reregister\r\n:showdown QUIT *\r\n"
        );
    }

    #[tokio::test]
    async fn test_session_failure_is_reported() {
        // テスト項目: セッションを開けない場合、NOTICE で理由を伝えて切断する
        // given (前提条件):
        let mut sessions = MockSessionFactory::new();
        sessions
            .expect_open()
            .times(1)
            .withf(|login, _| {
                login.nickname == "Alice Smith"
                    && login.password == "secret"
                    && login.rooms == vec!["lobby".to_string()]
            })
            .returning(|_, _| Err(SessionError::Discovery(DiscoveryError::ServerNotFound)));

        // when (操作):
        let output = exchange(
            sessions,
            "PASS secret\r\nNICK alice\r\nUSER alice 0 * :Alice Smith\r\n",
        )
        .await;

        // then (期待する結果):
        assert_eq!(
            output,
            concat!(
                ":showdown NOTICE # :Server does not exist\r\n",
                ":showdown QUIT Alice\u{a0}Smith\r\n",
            )
        );
    }

    #[tokio::test]
    async fn test_empty_realname_falls_back_to_nick() {
        // テスト項目: USER の実名が空なら NICK の値でログインする
        // given (前提条件):
        let mut sessions = MockSessionFactory::new();
        sessions
            .expect_open()
            .times(1)
            .withf(|login, _| login.nickname == "alice")
            .returning(|_, _| Err(SessionError::Discovery(DiscoveryError::ServerNotFound)));

        // when (操作):
        let output = exchange(sessions, "USER alice 0 * :\r\nNICK alice\r\n").await;

        // then (期待する結果):
        assert!(output.ends_with(":showdown QUIT alice\r\n"));
    }

    #[tokio::test]
    async fn test_erroneous_nicknames_are_rejected() {
        // テスト項目: 空または : で始まるニックネームは 432 で拒否し、登録しない
        // given (前提条件):
        let sessions = MockSessionFactory::new();

        // when (操作):
        let output = exchange(sessions, "NICK :\r\nUSER a 0 * ::x\r\nQUIT\r\n").await;

        // then (期待する結果):
        assert_eq!(
            output,
            concat!(
                ":showdown 432 *  :Erroneus nickname\r\n",
                ":showdown 432 * :x :Erroneus nickname\r\n",
                ":showdown QUIT *\r\n",
            )
        );
    }

    #[tokio::test]
    async fn test_valid_nick_after_rejected_one() {
        // テスト項目: 拒否された後に正しいニックネームを送ると登録を続けられる
        // given (前提条件):
        let mut sessions = MockSessionFactory::new();
        sessions
            .expect_open()
            .times(1)
            .withf(|login, _| login.nickname == "bob")
            .returning(|_, _| Err(SessionError::Discovery(DiscoveryError::ServerNotFound)));

        // when (操作):
        let output = exchange(sessions, "NICK ::bob\r\nUSER bob 0 * :\r\nNICK bob\r\n").await;

        // then (期待する結果):
        assert_eq!(
            output,
            concat!(
                ":showdown 432 * :bob :Erroneus nickname\r\n",
                ":showdown NOTICE # :Server does not exist\r\n",
                ":showdown QUIT bob\r\n",
            )
        );
    }
}
