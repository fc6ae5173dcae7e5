use std::time::Duration;

/// Session lifecycle notifications
///
/// Informational only; dispatch events keep flowing through the
/// [`EventDispatcher`](crate::EventDispatcher) across reconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new session started
    Ready { session_id: String },
    /// The previous session was resumed
    Resumed { session_id: String, sequence: Option<u64> },
    /// The gateway invalidated the session
    Invalidated { resumable: bool },
    /// The connection dropped; reconnecting after `delay`
    Reconnecting {
        attempt: u32,
        resumable: bool,
        delay: Duration,
    },
    /// The session ended and will not reconnect
    Closed { code: Option<u16>, reason: String },
}
