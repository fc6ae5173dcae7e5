//! Session state and its transitions

use super::{Backoff, ConnectionState, SessionStatus};
use std::time::Duration;
use tokio::time::Instant;

/// How to authenticate after Hello
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// Start a new session
    Identify,
    /// Continue the stored session
    Resume { session_id: String, sequence: u64 },
}

/// Outcome of a heartbeat timer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatTick {
    /// Send a heartbeat carrying this sequence
    Send(Option<u64>),
    /// The previous heartbeat was never acknowledged
    Zombie,
}

/// State of one gateway session across connections
#[derive(Debug)]
pub struct Session {
    state: ConnectionState,
    session_id: Option<String>,
    sequence: Option<u64>,
    resume_url: Option<String>,
    heartbeat_interval: Option<Duration>,
    ack_pending: bool,
    last_heartbeat: Option<Instant>,
    latency: Option<Duration>,
    /// Whether the last disconnect allows resuming
    resumable: bool,
    backoff: Backoff,
}

impl Session {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            session_id: None,
            sequence: None,
            resume_url: None,
            heartbeat_interval: None,
            ack_pending: false,
            last_heartbeat: None,
            latency: None,
            resumable: false,
            backoff,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// Gateway URL to reconnect to when resuming, from Ready
    pub fn resume_url(&self) -> Option<&str> {
        self.resume_url.as_deref()
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval
    }

    pub fn is_ack_pending(&self) -> bool {
        self.ack_pending
    }

    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    pub fn attempts(&self) -> u32 {
        self.backoff.attempt()
    }

    /// A stored session exists and the last disconnect allows resuming it
    pub fn can_resume(&self) -> bool {
        self.resumable && self.session_id.is_some() && self.sequence.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            session_id: self.session_id.clone(),
            sequence: self.sequence,
            latency: self.latency,
            attempts: self.attempts(),
        }
    }

    fn transition(&mut self, to: ConnectionState) {
        if self.state != to {
            tracing::debug!(from = %self.state, to = %to, "Session state changed");
            self.state = to;
        }
    }

    fn discard(&mut self) {
        self.session_id = None;
        self.sequence = None;
        self.resume_url = None;
    }

    /// Opening a transport
    pub fn connecting(&mut self) {
        self.ack_pending = false;
        self.heartbeat_interval = None;
        self.transition(ConnectionState::Connecting);
    }

    /// Transport is open
    pub fn opened(&mut self) {
        self.transition(ConnectionState::AwaitingHello);
    }

    /// Hello received; heartbeating starts
    pub fn hello(&mut self, interval: Duration) {
        self.heartbeat_interval = Some(interval);
        self.ack_pending = false;
    }

    /// Choose Resume when a resumable session is stored, Identify otherwise
    ///
    /// Identify discards the stored session.
    pub fn begin_handshake(&mut self) -> Handshake {
        if let (true, Some(session_id), Some(sequence)) =
            (self.resumable, self.session_id.clone(), self.sequence)
        {
            self.transition(ConnectionState::Resuming);
            return Handshake::Resume {
                session_id,
                sequence,
            };
        }

        self.discard();
        self.transition(ConnectionState::Identifying);
        Handshake::Identify
    }

    /// Ready received: a new session with a fresh sequence
    pub fn ready(&mut self, session_id: String, resume_url: Option<String>, sequence: Option<u64>) {
        tracing::info!(session_id = %session_id, "Session ready");

        self.session_id = Some(session_id);
        self.resume_url = resume_url;
        self.sequence = sequence;
        self.connected();
    }

    /// Resumed received: session id and sequence carry over
    pub fn resumed(&mut self, sequence: Option<u64>) {
        if let Some(sequence) = sequence {
            self.observe_sequence(sequence);
        }

        tracing::info!(
            session_id = ?self.session_id,
            seq = ?self.sequence,
            "Session resumed"
        );
        self.connected();
    }

    fn connected(&mut self) {
        self.resumable = true;
        self.backoff.reset();
        self.transition(ConnectionState::Connected);
    }

    /// Record a dispatch sequence number
    ///
    /// Returns `false` for duplicates and out-of-order frames, which leave the
    /// stored sequence untouched.
    pub fn observe_sequence(&mut self, sequence: u64) -> bool {
        match self.sequence {
            Some(current) if sequence <= current => false,
            _ => {
                self.sequence = Some(sequence);
                true
            }
        }
    }

    /// Heartbeat timer fired
    pub fn heartbeat_tick(&mut self, now: Instant) -> HeartbeatTick {
        if self.ack_pending {
            return HeartbeatTick::Zombie;
        }

        self.ack_pending = true;
        self.last_heartbeat = Some(now);
        HeartbeatTick::Send(self.sequence)
    }

    pub fn heartbeat_ack(&mut self, now: Instant) {
        self.ack_pending = false;
        if let Some(sent) = self.last_heartbeat {
            self.latency = Some(now.saturating_duration_since(sent));
        }
    }

    /// Invalid Session received
    ///
    /// A non-resumable invalidation drops the session at once; the state reads
    /// `Identifying` while the delayed Identify is pending.
    pub fn invalidated(&mut self, resumable: bool) {
        self.resumable = resumable;
        if !resumable {
            self.discard();
            self.transition(ConnectionState::Identifying);
        }
    }

    /// The connection dropped; returns the backoff before reconnecting
    pub fn disconnected(&mut self, resumable: bool) -> Duration {
        self.resumable = resumable;
        if !resumable {
            self.discard();
        }

        self.ack_pending = false;
        self.heartbeat_interval = None;
        self.transition(ConnectionState::Reconnecting);
        self.backoff.next_delay()
    }

    /// Shut down for good; the session cannot be resumed afterwards
    pub fn close(&mut self) {
        self.discard();
        self.resumable = false;
        self.ack_pending = false;
        self.heartbeat_interval = None;
        self.transition(ConnectionState::Closed);
    }
}
