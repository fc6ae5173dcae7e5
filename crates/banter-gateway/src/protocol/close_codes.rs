//! Gateway close codes

use std::fmt;

/// Close code the client uses when it ends the session for good
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code the client uses when it drops a connection it intends to resume
///
/// Any code other than 1000 and 1001 keeps the session resumable.
pub const RECONNECT_CLOSURE: u16 = 4900;

/// What the client does after the server closed the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseAction {
    /// Reconnect and resume the session
    Resume,
    /// Reconnect with a new session
    Reidentify,
    /// Stop; reconnecting cannot succeed
    Fatal,
}

/// Close codes sent by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    NotAuthenticated = 4003,
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    InvalidSequence = 4007,
    RateLimited = 4008,
    SessionTimedOut = 4009,
    InvalidShard = 4010,
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    DisallowedIntents = 4014,
}

const ALL: [CloseCode; 14] = [
    CloseCode::UnknownError,
    CloseCode::UnknownOpcode,
    CloseCode::DecodeError,
    CloseCode::NotAuthenticated,
    CloseCode::AuthenticationFailed,
    CloseCode::AlreadyAuthenticated,
    CloseCode::InvalidSequence,
    CloseCode::RateLimited,
    CloseCode::SessionTimedOut,
    CloseCode::InvalidShard,
    CloseCode::ShardingRequired,
    CloseCode::InvalidApiVersion,
    CloseCode::InvalidIntents,
    CloseCode::DisallowedIntents,
];

impl CloseCode {
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        ALL.into_iter().find(|code| code.as_u16() == value)
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub const fn action(self) -> CloseAction {
        match self {
            Self::UnknownError
            | Self::UnknownOpcode
            | Self::DecodeError
            | Self::NotAuthenticated
            | Self::AlreadyAuthenticated
            | Self::RateLimited => CloseAction::Resume,
            Self::InvalidSequence | Self::SessionTimedOut => CloseAction::Reidentify,
            Self::AuthenticationFailed
            | Self::InvalidShard
            | Self::ShardingRequired
            | Self::InvalidApiVersion
            | Self::InvalidIntents
            | Self::DisallowedIntents => CloseAction::Fatal,
        }
    }

    /// Reconnecting can succeed
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        !matches!(self.action(), CloseAction::Fatal)
    }

    /// Classify any close, including codes outside the gateway range and
    /// connections that dropped without a close frame
    #[must_use]
    pub fn classify(code: Option<u16>) -> CloseAction {
        code.and_then(Self::from_u16)
            .map_or(CloseAction::Resume, Self::action)
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error",
            Self::UnknownOpcode => "Unknown opcode sent",
            Self::DecodeError => "Invalid payload sent",
            Self::NotAuthenticated => "Payload sent before identifying",
            Self::AuthenticationFailed => "Invalid token",
            Self::AlreadyAuthenticated => "Identify sent more than once",
            Self::InvalidSequence => "Invalid sequence sent when resuming",
            Self::RateLimited => "Payloads sent too quickly",
            Self::SessionTimedOut => "Session timed out",
            Self::InvalidShard => "Invalid shard sent when identifying",
            Self::ShardingRequired => "Too many guilds, sharding required",
            Self::InvalidApiVersion => "Invalid gateway version",
            Self::InvalidIntents => "Invalid intents",
            Self::DisallowedIntents => "Intent not enabled or not approved",
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({}): {}", self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_from_u16() {
        assert_eq!(CloseCode::from_u16(4000), Some(CloseCode::UnknownError));
        assert_eq!(CloseCode::from_u16(4014), Some(CloseCode::DisallowedIntents));
        assert_eq!(CloseCode::from_u16(4006), None);
        assert_eq!(CloseCode::from_u16(1000), None);
    }

    #[test]
    fn test_close_actions() {
        for code in [4000, 4001, 4002, 4003, 4005, 4008] {
            assert_eq!(CloseCode::classify(Some(code)), CloseAction::Resume, "{code}");
        }
        for code in [4007, 4009] {
            assert_eq!(CloseCode::classify(Some(code)), CloseAction::Reidentify, "{code}");
        }
        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert_eq!(CloseCode::classify(Some(code)), CloseAction::Fatal, "{code}");
        }
    }

    #[test]
    fn test_non_gateway_closes_resume() {
        assert_eq!(CloseCode::classify(None), CloseAction::Resume);
        assert_eq!(CloseCode::classify(Some(1006)), CloseAction::Resume);
        assert_eq!(CloseCode::classify(Some(RECONNECT_CLOSURE)), CloseAction::Resume);
    }

    #[test]
    fn test_should_reconnect() {
        assert!(CloseCode::RateLimited.should_reconnect());
        assert!(CloseCode::SessionTimedOut.should_reconnect());
        assert!(!CloseCode::AuthenticationFailed.should_reconnect());
        assert!(!CloseCode::DisallowedIntents.should_reconnect());
    }

    #[test]
    fn test_close_code_display() {
        let display = CloseCode::AuthenticationFailed.to_string();
        assert!(display.contains("4004"));
        assert!(display.contains("AuthenticationFailed"));
    }
}
