//! Gateway error types

use crate::protocol::CloseCode;
use crate::transport::TransportError;
use thiserror::Error;

/// Gateway error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The token was rejected (close 4004)
    #[error("Authentication failed: the gateway rejected the token")]
    AuthenticationFailed,

    /// Closed with a code that makes reconnecting pointless
    #[error("Gateway closed the session: {code} {reason}")]
    Fatal { code: u16, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to encode or decode a frame: {0}")]
    Decode(String),

    /// No connection is open to send on
    #[error("Not connected")]
    NotConnected,

    /// The session was shut down
    #[error("Gateway session closed")]
    Closed,
}

impl GatewayError {
    /// Error for a close frame whose code forbids reconnecting
    pub fn from_close(code: u16, reason: &str) -> Self {
        match CloseCode::from_u16(code) {
            Some(CloseCode::AuthenticationFailed) => Self::AuthenticationFailed,
            Some(known) if reason.is_empty() => Self::Fatal {
                code,
                reason: known.description().to_string(),
            },
            _ => Self::Fatal {
                code,
                reason: reason.to_string(),
            },
        }
    }

    /// Retrying can never succeed
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::Fatal { .. })
    }

    /// Caused by the network and worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::NotConnected)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;
