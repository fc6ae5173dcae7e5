//! Heartbeat (op 1) and Heartbeat ACK (op 11) handlers

use super::Action;
use crate::protocol::GatewayMessage;
use crate::session::Session;
use tokio::time::Instant;

pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// The server asked for an immediate heartbeat
    pub fn handle_request(session: &Session) -> Vec<Action> {
        tracing::trace!(seq = ?session.sequence(), "Heartbeat requested by server");
        vec![Action::Send(GatewayMessage::heartbeat(session.sequence()))]
    }

    pub fn handle_ack(session: &mut Session, now: Instant) -> Vec<Action> {
        session.heartbeat_ack(now);
        tracing::trace!(latency_ms = ?session.latency().map(|l| l.as_millis()), "Heartbeat acknowledged");
        Vec::new()
    }
}
