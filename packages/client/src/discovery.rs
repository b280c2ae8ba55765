//! Resolving a Showdown server name to its WebSocket address.
//!
//! Every registered server publishes its connection settings through the
//! cross-domain page of the main site as a JavaScript assignment:
//!
//! ```text
//! var config = "{\"host\":\"sim.psim.us\",\"port\":443}";
//! ```

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::error::DiscoveryError;

pub const CROSSDOMAIN_URL: &str = "https://play.pokemonshowdown.com/crossdomain.php";

/// The main server advertises this host, which is not directly reachable.
const MAIN_SERVER_HOST: &str = "showdown";
const MAIN_SERVER_FALLBACK: (&str, u16) = ("sim.psim.us", 443);

static CONFIG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^var config = (.*);$").expect("config pattern is a valid regex")
});

/// Host and port of a Showdown server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerAddress {
    #[serde(alias = "Host")]
    pub host: String,
    #[serde(alias = "Port")]
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `wss` on port 443, plain `ws` elsewhere.
    pub fn websocket_url(&self) -> String {
        let scheme = if self.port == 443 { "wss" } else { "ws" };
        format!("{}://{}:{}/showdown/websocket", scheme, self.host, self.port)
    }
}

#[async_trait]
pub trait ServerResolver: Send + Sync {
    async fn resolve(&self, server: &str) -> Result<ServerAddress, DiscoveryError>;
}

/// [`ServerResolver`] that reads the cross-domain page.
#[derive(Debug, Clone)]
pub struct CrossDomainResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl CrossDomainResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, CROSSDOMAIN_URL)
    }

    pub fn with_endpoint(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl Default for CrossDomainResolver {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl ServerResolver for CrossDomainResolver {
    async fn resolve(&self, server: &str) -> Result<ServerAddress, DiscoveryError> {
        let host = qualify_server_name(server);
        tracing::debug!("Looking up server configuration for {}", host);

        let body = self
            .client
            .get(&self.endpoint)
            .query(&[("host", host.as_str())])
            .send()
            .await?
            .text()
            .await?;

        let address = parse_configuration(&body)?;
        tracing::info!("Server '{}' is at {}:{}", server, address.host, address.port);
        Ok(address)
    }
}

/// Bare server names live under `.psim.us`.
pub fn qualify_server_name(server: &str) -> String {
    if server.contains('.') {
        server.to_string()
    } else {
        format!("{}.psim.us", server)
    }
}

/// Extract the server address from a cross-domain page.
pub fn parse_configuration(body: &str) -> Result<ServerAddress, DiscoveryError> {
    let literal = CONFIG_PATTERN
        .captures(body)
        .and_then(|captures| captures.get(1))
        .ok_or(DiscoveryError::ServerNotFound)?
        .as_str();

    // The configuration is a JSON object serialized into a JSON string.
    let encoded: String = serde_json::from_str(literal)?;
    let address: ServerAddress = serde_json::from_str(&encoded)?;

    if address.host == MAIN_SERVER_HOST {
        let (host, port) = MAIN_SERVER_FALLBACK;
        return Ok(ServerAddress::new(host, port));
    }
    Ok(address)
}
