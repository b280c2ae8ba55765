//! Error types for the Showdown client.

use thiserror::Error;

/// WebSocket transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// The WebSocket handshake failed
    #[error("Connection error: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    /// The outbound queue no longer accepts frames
    #[error("Connection closed")]
    Closed,
}

/// Login (challenge/assertion) errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// The HTTP request to the login server failed
    #[error("Login request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The login server answered with an empty body
    #[error("Login server returned an empty response")]
    EmptyResponse,

    /// The login server answered with something that is not an assertion
    #[error("Malformed login response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// Server discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The HTTP request to the discovery endpoint failed
    #[error("Server lookup failed: {0}")]
    Request(#[from] reqwest::Error),

    /// No configuration was published for the server name
    #[error("Server does not exist")]
    ServerNotFound,

    /// The published configuration could not be decoded
    #[error("Malformed server configuration: {0}")]
    MalformedConfiguration(#[from] serde_json::Error),
}

/// Errors surfaced while establishing or using a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
}
