//! # banter-gateway
//!
//! Persistent gateway session: handshake, heartbeating, sequence tracking,
//! resume or re-identify, and reconnection with backoff. Decoded dispatch
//! events are delivered in order to every subscriber of the [`EventDispatcher`].

pub mod broadcast;
pub mod client;
pub mod error;
pub mod events;
pub mod handlers;
pub mod protocol;
pub mod session;
pub mod transport;

pub use broadcast::{EventDispatcher, EventStream};
pub use client::{BackoffConfig, GatewayBuilder, GatewayClient, GatewayConfig};
pub use error::{GatewayError, GatewayResult};
pub use events::{DispatchEvent, GatewayEventType, SessionEvent};
pub use protocol::{CloseAction, CloseCode, GatewayMessage, OpCode};
pub use session::{ConnectionState, SessionStatus};
pub use transport::{
    MemoryPeer, MemoryServer, MemoryTransport, Transport, TransportConnection, TransportError,
    TransportMessage, WebSocketTransport,
};
