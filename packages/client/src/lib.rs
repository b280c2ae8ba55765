//! Pokémon Showdown chat client.
//!
//! - `transport`: paced WebSocket transport
//! - `session`: protocol dispatcher, login and command encoding
//! - `room`: per-room roster state
//! - `discovery`: resolving a server name to a WebSocket address

pub mod auth;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod message;
pub mod room;
pub mod session;
pub mod transport;

pub use auth::{Authenticator, HttpAuthenticator};
pub use discovery::{CrossDomainResolver, ServerAddress, ServerResolver};
pub use error::{AuthError, DiscoveryError, SessionError, TransportError};
pub use identity::{RoomId, User, UserId, to_id};
pub use message::ServerMessage;
pub use room::Room;
pub use session::{EventHandler, LoginData, LoginSignal, Session};
pub use transport::{FrameSink, Transport};
