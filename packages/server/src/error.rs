//! Error types for the IRC gateway.

use thiserror::Error;

/// Errors that stop the gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Binding or inspecting the listener failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
