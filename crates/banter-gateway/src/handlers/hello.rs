//! Hello handler (op 10)

use super::{Action, HandlerError, HandlerResult, MessageDispatcher};
use crate::client::GatewayConfig;
use crate::protocol::HelloPayload;
use crate::session::Session;
use std::time::Duration;

pub struct HelloHandler;

impl HelloHandler {
    /// Start heartbeating and authenticate
    pub fn handle(
        session: &mut Session,
        config: &GatewayConfig,
        payload: &HelloPayload,
    ) -> HandlerResult<Vec<Action>> {
        if payload.heartbeat_interval == 0 {
            return Err(HandlerError::InvalidPayload(
                "Hello with a zero heartbeat interval".to_string(),
            ));
        }

        let interval = Duration::from_millis(payload.heartbeat_interval);
        tracing::debug!(interval_ms = payload.heartbeat_interval, "Hello received");

        session.hello(interval);
        let frame = MessageDispatcher::handshake(session, config);

        Ok(vec![Action::StartHeartbeat(interval), Action::Send(frame)])
    }
}
