use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle state of a gateway session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// Not started yet
    #[default]
    Disconnected,
    /// Opening the transport
    Connecting,
    /// Transport open, waiting for Hello
    AwaitingHello,
    /// Identify sent, waiting for Ready
    Identifying,
    /// Resume sent, waiting for Resumed
    Resuming,
    Connected,
    /// Waiting out the backoff before the next connection attempt
    Reconnecting,
    /// Shut down; terminal
    Closed,
}

impl ConnectionState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::AwaitingHello => "AwaitingHello",
            Self::Identifying => "Identifying",
            Self::Resuming => "Resuming",
            Self::Connected => "Connected",
            Self::Reconnecting => "Reconnecting",
            Self::Closed => "Closed",
        }
    }

    /// A transport is open
    #[must_use]
    pub const fn has_connection(self) -> bool {
        matches!(
            self,
            Self::AwaitingHello | Self::Identifying | Self::Resuming | Self::Connected
        )
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of a session, published on every transition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub session_id: Option<String>,
    pub sequence: Option<u64>,
    /// Round trip of the last acknowledged heartbeat
    pub latency: Option<Duration>,
    /// Reconnect attempts since the last successful connection
    pub attempts: u32,
}
