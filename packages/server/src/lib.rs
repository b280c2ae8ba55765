//! IRC server that puts IRC clients on Pokémon Showdown chat.
//!
//! - `irc`: line framing, numerics and name mapping
//! - `writer`: the per-client outbound line queue
//! - `render`: Showdown HTML to IRC text
//! - `translate`: Showdown events to IRC lines and IRC commands to Showdown
//! - `connection`: one client, from registration to QUIT
//! - `server`: the TCP accept loop

pub mod config;
pub mod connection;
pub mod connector;
pub mod error;
pub mod irc;
pub mod render;
pub mod server;
pub mod signal;
pub mod translate;
pub mod writer;

pub use config::GatewayConfig;
pub use connection::{GatewayContext, serve_connection};
pub use connector::{SessionFactory, ShowdownConnector};
pub use error::GatewayError;
pub use server::{run_server, serve};
