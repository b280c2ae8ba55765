//! Showdown session: command encoding, login and inbound dispatch.
//!
//! ## Flow
//!
//! 1. `Session::connect` dials the server with a [`Transport`]
//! 2. the dispatcher task reads every inbound frame in order
//! 3. for each message the built-in handlers update the room registry (and
//!    perform the login on `challstr`), then the [`EventHandler`] runs
//! 4. when the inbound stream ends, [`EventHandler::on_disconnect`] runs once
//!
//! The room registry is owned by the dispatcher task, so handlers always see
//! the state left by the built-ins for the same message.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::{
    auth::Authenticator,
    discovery::ServerAddress,
    error::SessionError,
    identity::{RoomId, User, UserId},
    message::{ServerMessage, chat_frame, command_frame},
    room::Room,
    transport::{FrameSink, Transport},
};

/// Resolves once the login finished, successfully or not.
pub type LoginSignal = oneshot::Receiver<Result<(), SessionError>>;

/// Credentials and rooms to join after login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginData {
    pub nickname: String,
    pub password: String,
    pub rooms: Vec<String>,
}

/// Receives every inbound message after the built-in handlers ran.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// # Arguments
    ///
    /// * `message` - the parsed message
    /// * `room` - the registered room, or an empty view for unknown rooms
    /// * `departed` - the user removed by a leave or rename, if any
    /// * `session` - handle for sending commands back
    async fn on_message(
        &mut self,
        message: &ServerMessage,
        room: &Room,
        departed: Option<&User>,
        session: &Session,
    );

    /// The connection to the server is gone.
    async fn on_disconnect(&mut self, session: &Session);
}

/// Cheap, clonable handle used to talk to the server.
#[derive(Clone)]
pub struct Session {
    sink: Arc<dyn FrameSink>,
    closing: Arc<AtomicBool>,
}

impl Session {
    /// Wrap a frame sink without starting a dispatcher.
    pub fn new(sink: Arc<dyn FrameSink>) -> Self {
        Self {
            sink,
            closing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Connect to `address` and start dispatching.
    pub async fn connect<H>(
        login: LoginData,
        address: &ServerAddress,
        authenticator: Arc<dyn Authenticator>,
        handler: H,
    ) -> Result<(Self, LoginSignal), SessionError>
    where
        H: EventHandler + 'static,
    {
        let (transport, inbound) = Transport::connect(&address.websocket_url()).await?;
        Ok(Self::start(
            Arc::new(transport),
            inbound,
            login,
            authenticator,
            handler,
        ))
    }

    /// Start the dispatcher over an existing sink and inbound stream.
    pub fn start<H>(
        sink: Arc<dyn FrameSink>,
        inbound: mpsc::Receiver<String>,
        login: LoginData,
        authenticator: Arc<dyn Authenticator>,
        handler: H,
    ) -> (Self, LoginSignal)
    where
        H: EventHandler + 'static,
    {
        let session = Self::new(sink);
        let (logged_in_tx, logged_in_rx) = oneshot::channel();

        let dispatcher = Dispatcher {
            session: session.clone(),
            rooms: HashMap::new(),
            login,
            authenticator,
            logged_in: Some(logged_in_tx),
            handler,
        };
        tokio::spawn(dispatcher.run(inbound));

        (session, logged_in_rx)
    }

    /// `|/command argument`
    pub async fn send_global(&self, command: &str, argument: &str) -> Result<(), SessionError> {
        self.send_to_room(command, argument, &RoomId::global()).await
    }

    /// `room|/command argument`
    pub async fn send_to_room(
        &self,
        command: &str,
        argument: &str,
        room: &RoomId,
    ) -> Result<(), SessionError> {
        self.sink
            .send_text(command_frame(room, command, argument))
            .await?;
        Ok(())
    }

    /// Send a chat line. Empty messages are not sent.
    pub async fn say(&self, message: &str, room: &RoomId) -> Result<(), SessionError> {
        if let Some(frame) = chat_frame(room, message) {
            self.sink.send_text(frame).await?;
        }
        Ok(())
    }

    /// Close the connection. Later disconnect notifications report it as
    /// requested.
    pub async fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
        self.sink.close().await;
    }

    /// Whether `close` was called.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}

/// Built-in protocol commands that update session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Challenge,
    Init,
    Roster,
    Deinit,
    Join,
    Leave,
    Rename,
}

impl Builtin {
    fn from_command(command: &str) -> Option<Self> {
        match command {
            "challstr" => Some(Self::Challenge),
            "init" => Some(Self::Init),
            "users" => Some(Self::Roster),
            "deinit" => Some(Self::Deinit),
            "j" | "J" | "join" => Some(Self::Join),
            "l" | "L" | "leave" => Some(Self::Leave),
            "n" | "N" | "name" => Some(Self::Rename),
            _ => None,
        }
    }
}

struct Dispatcher<H> {
    session: Session,
    rooms: HashMap<RoomId, Room>,
    login: LoginData,
    authenticator: Arc<dyn Authenticator>,
    logged_in: Option<oneshot::Sender<Result<(), SessionError>>>,
    handler: H,
}

impl<H: EventHandler> Dispatcher<H> {
    async fn run(mut self, mut inbound: mpsc::Receiver<String>) {
        while let Some(frame) = inbound.recv().await {
            for message in ServerMessage::parse_frame(&frame) {
                self.dispatch(message).await;
            }
        }

        tracing::info!("Connection to the server ended");
        self.handler.on_disconnect(&self.session).await;
    }

    async fn dispatch(&mut self, message: ServerMessage) {
        let departed = self.apply_builtin(&message).await;

        let transient;
        let room = match self.rooms.get(&message.room) {
            Some(room) => room,
            None => {
                transient = Room::new(message.room.clone());
                &transient
            }
        };

        self.handler
            .on_message(&message, room, departed.as_ref(), &self.session)
            .await;
    }

    async fn apply_builtin(&mut self, message: &ServerMessage) -> Option<User> {
        let builtin = Builtin::from_command(&message.command)?;
        let argument = message.argument.as_str();

        match builtin {
            Builtin::Challenge => {
                self.login(argument).await;
                None
            }
            Builtin::Init => {
                self.register(&message.room).apply_init(argument);
                None
            }
            Builtin::Roster => {
                self.register(&message.room).apply_full_roster(argument);
                None
            }
            Builtin::Deinit => {
                self.rooms.remove(&message.room);
                tracing::debug!("Room '{}' unregistered", message.room);
                None
            }
            Builtin::Join => {
                self.registered(&message.room)?.apply_join(argument);
                None
            }
            Builtin::Leave => self.registered(&message.room)?.apply_leave(argument),
            Builtin::Rename => {
                let Some((new_raw, old_id)) = argument.split_once('|') else {
                    tracing::warn!("Malformed rename: {}", argument);
                    return None;
                };
                self.registered(&message.room)?
                    .apply_rename(new_raw, &UserId::new(old_id))
            }
        }
    }

    fn register(&mut self, id: &RoomId) -> &mut Room {
        self.rooms.entry(id.clone()).or_insert_with(|| {
            tracing::debug!("Room '{}' registered", id);
            Room::new(id.clone())
        })
    }

    fn registered(&mut self, id: &RoomId) -> Option<&mut Room> {
        let room = self.rooms.get_mut(id);
        if room.is_none() {
            tracing::debug!("Roster update for unknown room '{}' ignored", id);
        }
        room
    }

    async fn login(&mut self, challenge: &str) {
        let result = self.authenticate(challenge).await;
        let succeeded = result.is_ok();
        if let Err(e) = &result {
            tracing::error!("Login as '{}' failed: {}", self.login.nickname, e);
        }

        match self.logged_in.take() {
            Some(signal) => {
                let _ = signal.send(result);
            }
            None => tracing::debug!("Login signal already consumed"),
        }

        if succeeded {
            for room in &self.login.rooms {
                if let Err(e) = self.session.send_global("join", room).await {
                    tracing::warn!("Failed to join '{}': {}", room, e);
                }
            }
        }
    }

    async fn authenticate(&self, challenge: &str) -> Result<(), SessionError> {
        let assertion = self
            .authenticator
            .assertion(&self.login.nickname, &self.login.password, challenge)
            .await?;
        let value = format!("{},0,{}", self.login.nickname, assertion);
        self.session.send_global("trn", &value).await?;
        tracing::info!("Logged in as '{}'", self.login.nickname);
        Ok(())
    }
}
