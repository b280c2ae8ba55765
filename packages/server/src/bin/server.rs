//! IRC gateway for Pokémon Showdown chat.
//!
//! Point an IRC client at the gateway. NICK and USER register the client,
//! the USER real name becomes the Showdown name and PASS its password.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin showdown-irc-server
//! cargo run --bin showdown-irc-server -- --port 6668 --autojoin lobby,help
//! ```

use std::time::Duration;

use clap::Parser;
use showdown_irc_server::{GatewayConfig, run_server};
use showdown_irc_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "showdown-irc-server")]
#[command(about = "IRC gateway for Pokémon Showdown chat", long_about = None)]
struct Args {
    /// Host address to bind the IRC listener to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the IRC listener to
    #[arg(short = 'p', long, default_value = "6667")]
    port: u16,

    /// Showdown server name, e.g. "showdown" for the main server
    #[arg(long, default_value = "showdown")]
    server: String,

    /// Rooms to join after login, comma separated
    #[arg(long, value_delimiter = ',')]
    autojoin: Vec<String>,

    /// Seconds to wait for the Showdown login
    #[arg(long, default_value = "10")]
    login_timeout: u64,
}

impl From<Args> for GatewayConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            server: args.server,
            autojoin: args.autojoin,
            login_timeout: Duration::from_secs(args.login_timeout),
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    if let Err(e) = run_server(args.into()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
