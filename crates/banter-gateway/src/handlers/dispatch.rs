//! Dispatch handler (op 0)

use super::{Action, HandlerError, HandlerResult};
use crate::events::{DispatchEvent, SessionEvent};
use crate::protocol::{GatewayMessage, ReadyPayload, READY_EVENT, RESUMED_EVENT};
use crate::session::Session;
use serde::Deserialize;
use serde_json::Value;

pub struct DispatchHandler;

impl DispatchHandler {
    /// Track the sequence, complete handshakes, and hand the event on
    ///
    /// Frames whose sequence is not newer than the stored one are dropped.
    pub fn handle(session: &mut Session, message: GatewayMessage) -> HandlerResult<Vec<Action>> {
        let Some(name) = message.t else {
            return Err(HandlerError::InvalidPayload(
                "Dispatch without an event name".to_string(),
            ));
        };
        let data = message.d.unwrap_or(Value::Null);
        let mut actions = Vec::with_capacity(2);

        match name.as_str() {
            READY_EVENT => {
                let ready = ReadyPayload::deserialize(&data).map_err(|e| {
                    HandlerError::InvalidPayload(format!("Invalid Ready payload: {e}"))
                })?;

                session.ready(ready.session_id.clone(), ready.resume_gateway_url, message.s);
                actions.push(Action::Notify(SessionEvent::Ready {
                    session_id: ready.session_id,
                }));
            }
            RESUMED_EVENT => {
                session.resumed(message.s);
                actions.push(Action::Notify(SessionEvent::Resumed {
                    session_id: session.session_id().unwrap_or_default().to_string(),
                    sequence: session.sequence(),
                }));
            }
            _ => {
                if let Some(seq) = message.s {
                    if !session.observe_sequence(seq) {
                        tracing::trace!(
                            event = %name,
                            seq,
                            current = ?session.sequence(),
                            "Dropping stale dispatch"
                        );
                        return Ok(Vec::new());
                    }
                }
            }
        }

        actions.push(Action::Dispatch(DispatchEvent::new(name, message.s, data)));
        Ok(actions)
    }
}
