//! Client error types

use banter_common::{ConfigError, TracingError};
use banter_gateway::GatewayError;
use banter_rest::RestError;
use thiserror::Error;

/// Any error raised by the client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Rest(#[from] RestError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tracing(#[from] TracingError),
}

impl ClientError {
    /// Retrying can never succeed
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Rest(e) => e.is_fatal(),
            Self::Gateway(e) => e.is_fatal(),
            Self::Config(_) => true,
            Self::Tracing(_) => false,
        }
    }

    /// Caused by the network and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Rest(e) => e.is_transient(),
            Self::Gateway(e) => e.is_transient(),
            Self::Config(_) | Self::Tracing(_) => false,
        }
    }
}

/// Client result type
pub type ClientResult<T> = Result<T, ClientError>;
