//! Handler error types

use crate::protocol::OpCode;
use thiserror::Error;

/// A frame that could not be applied to the session
///
/// The offending frame is dropped; the session carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Client-only op code received from the server
    #[error("Unexpected op code from server: {0}")]
    UnexpectedOpcode(OpCode),
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
