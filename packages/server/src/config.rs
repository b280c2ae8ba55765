//! Gateway configuration.

use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6667;
pub const DEFAULT_SERVER: &str = "showdown";
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by every IRC connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Address the IRC listener binds to
    pub host: String,
    /// Port the IRC listener binds to
    pub port: u16,
    /// Showdown server name, resolved through discovery
    pub server: String,
    /// Rooms joined right after login
    pub autojoin: Vec<String>,
    /// How long a client waits for the Showdown login
    pub login_timeout: Duration,
}

impl GatewayConfig {
    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            server: DEFAULT_SERVER.to_string(),
            autojoin: Vec::new(),
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }
}
