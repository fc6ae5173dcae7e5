//! Gateway operation codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who may send a frame with a given op code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
    Both,
}

/// The `op` field of every frame; it decides how `d` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum OpCode {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    PresenceUpdate = 3,
    VoiceStateUpdate = 4,
    Resume = 6,
    /// The server wants the client to reconnect and resume
    Reconnect = 7,
    RequestGuildMembers = 8,
    /// `d` says whether the session can be resumed
    InvalidSession = 9,
    /// First frame on a connection, carries the heartbeat interval
    Hello = 10,
    HeartbeatAck = 11,
}

const ALL: [OpCode; 11] = [
    OpCode::Dispatch,
    OpCode::Heartbeat,
    OpCode::Identify,
    OpCode::PresenceUpdate,
    OpCode::VoiceStateUpdate,
    OpCode::Resume,
    OpCode::Reconnect,
    OpCode::RequestGuildMembers,
    OpCode::InvalidSession,
    OpCode::Hello,
    OpCode::HeartbeatAck,
];

impl OpCode {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        ALL.into_iter().find(|op| op.as_u8() == value)
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn direction(self) -> Direction {
        match self {
            Self::Heartbeat => Direction::Both,
            Self::Dispatch
            | Self::Reconnect
            | Self::InvalidSession
            | Self::Hello
            | Self::HeartbeatAck => Direction::ServerToClient,
            Self::Identify
            | Self::PresenceUpdate
            | Self::VoiceStateUpdate
            | Self::Resume
            | Self::RequestGuildMembers => Direction::ClientToServer,
        }
    }

    pub const fn is_client_op(self) -> bool {
        !matches!(self.direction(), Direction::ServerToClient)
    }

    pub const fn is_server_op(self) -> bool {
        !matches!(self.direction(), Direction::ClientToServer)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or_else(|| format!("unknown op code: {value}"))
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op.as_u8()
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({})", self.as_u8())
    }
}
