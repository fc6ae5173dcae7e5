//! Op code handlers
//!
//! Each incoming frame is routed by op code to a handler that applies it to
//! the [`Session`] and returns the [`Action`]s the runner must carry out.
//! Handlers do no I/O.

mod dispatch;
mod error;
mod heartbeat;
mod hello;
mod invalid_session;

pub use dispatch::DispatchHandler;
pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use hello::HelloHandler;
pub use invalid_session::InvalidSessionHandler;

use crate::client::GatewayConfig;
use crate::events::{DispatchEvent, SessionEvent};
use crate::protocol::{GatewayMessage, OpCode, ResumePayload};
use crate::session::{Handshake, Session};
use std::time::Duration;
use tokio::time::Instant;

/// Side effect requested by a handler
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send a frame on the current connection
    Send(GatewayMessage),
    /// (Re)start the heartbeat timer with this interval
    StartHeartbeat(Duration),
    /// Deliver an event to subscribers
    Dispatch(DispatchEvent),
    /// Publish a lifecycle notification
    Notify(SessionEvent),
    /// Drop the connection and reconnect
    Reconnect { resumable: bool },
    /// Send Identify or Resume after a delay
    Handshake { delay: Duration },
}

/// Routes server frames to their handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Apply one server frame to the session
    pub fn dispatch(
        session: &mut Session,
        config: &GatewayConfig,
        message: GatewayMessage,
        now: Instant,
    ) -> HandlerResult<Vec<Action>> {
        if !message.op.is_server_op() {
            tracing::warn!(op = %message.op, "Received client-only op code from server");
            return Err(HandlerError::UnexpectedOpcode(message.op));
        }

        match message.op {
            OpCode::Hello => {
                let payload = message.as_hello().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid Hello payload".to_string())
                })?;

                HelloHandler::handle(session, config, &payload)
            }
            OpCode::Dispatch => DispatchHandler::handle(session, message),
            OpCode::Heartbeat => Ok(HeartbeatHandler::handle_request(session)),
            OpCode::HeartbeatAck => Ok(HeartbeatHandler::handle_ack(session, now)),
            OpCode::Reconnect => {
                tracing::info!(session_id = ?session.session_id(), "Server requested reconnect");
                Ok(vec![Action::Reconnect { resumable: true }])
            }
            OpCode::InvalidSession => {
                let resumable = message.as_invalid_session().unwrap_or(false);
                Ok(InvalidSessionHandler::handle(session, resumable))
            }
            // Unreachable after the is_server_op check
            other => Err(HandlerError::UnexpectedOpcode(other)),
        }
    }

    /// Choose Identify or Resume and build the frame for it
    pub fn handshake(session: &mut Session, config: &GatewayConfig) -> GatewayMessage {
        match session.begin_handshake() {
            Handshake::Identify => {
                tracing::debug!(intents = %config.intents, shard = ?config.shard, "Identifying");
                GatewayMessage::identify(&config.identify_payload())
            }
            Handshake::Resume {
                session_id,
                sequence,
            } => {
                tracing::debug!(session_id = %session_id, seq = sequence, "Resuming");
                GatewayMessage::resume(&ResumePayload {
                    token: config.token.clone(),
                    session_id,
                    seq: sequence,
                })
            }
        }
    }
}
