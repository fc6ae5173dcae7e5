//! REST error types

use banter_core::RouteError;
use thiserror::Error;

/// Errors raised by the rate limiter itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// The contract already completed or was cancelled
    #[error("Rate-limit contract already released")]
    ContractReleased,
}

/// REST client error type
#[derive(Debug, Error)]
pub enum RestError {
    /// Connection, TLS or timeout failure; the request may be retried
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The token was rejected (401)
    #[error("Unauthorized: the token was rejected")]
    Unauthorized,

    /// Any other non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        code: Option<u64>,
        message: String,
    },

    #[error("Gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Invalid route: {0}")]
    InvalidRoute(#[from] RouteError),

    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}

impl RestError {
    /// HTTP status associated with this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Worth retrying later
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::RetriesExhausted { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Retrying can never succeed
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// REST result type
pub type RestResult<T> = Result<T, RestError>;
