//! Pluggable connection providers
//!
//! The session never touches a socket directly. It asks a [`Transport`] for a
//! [`TransportConnection`] and exchanges [`TransportMessage`]s over it.

mod memory;
mod websocket;

pub use memory::{MemoryPeer, MemoryServer, MemoryTransport};
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use thiserror::Error;

/// One message on a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMessage {
    Text(String),
    Binary(Vec<u8>),
    /// The peer closed the connection, with its close code and reason if any
    Close(Option<(u16, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Failed to send: {0}")]
    Send(String),

    #[error("Failed to receive: {0}")]
    Receive(String),

    #[error("Connection closed")]
    Closed,
}

/// Opens connections
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Box<dyn TransportConnection>, TransportError>;
}

/// An open duplex connection
#[async_trait]
pub trait TransportConnection: Send {
    async fn send(&mut self, message: TransportMessage) -> Result<(), TransportError>;

    /// Next message from the peer; `None` once the connection is gone
    ///
    /// Must be cancel safe: dropping the future before it completes loses no
    /// message.
    async fn recv(&mut self) -> Option<Result<TransportMessage, TransportError>>;

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError>;
}
