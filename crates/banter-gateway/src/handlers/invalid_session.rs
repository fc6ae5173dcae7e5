//! Invalid Session handler (op 9)

use super::Action;
use crate::events::SessionEvent;
use crate::session::Session;
use rand::Rng;
use std::time::Duration;

/// Bounds of the random wait before authenticating again, in milliseconds
const RETRY_DELAY_MS: std::ops::RangeInclusive<u64> = 1_000..=5_000;

pub struct InvalidSessionHandler;

impl InvalidSessionHandler {
    /// Forget the session unless resumable, then authenticate again after a
    /// random delay
    pub fn handle(session: &mut Session, resumable: bool) -> Vec<Action> {
        tracing::warn!(
            session_id = ?session.session_id(),
            resumable,
            "Session invalidated"
        );

        session.invalidated(resumable);
        let delay = Duration::from_millis(rand::thread_rng().gen_range(RETRY_DELAY_MS));

        vec![
            Action::Notify(SessionEvent::Invalidated { resumable }),
            Action::Handshake { delay },
        ]
    }
}
