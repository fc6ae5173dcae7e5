//! Session bookkeeping
//!
//! [`Session`] is plain state with no I/O; the gateway runner owns it and
//! applies every transition from a single task.

mod backoff;
mod send_window;
mod session;
mod state;

pub use backoff::Backoff;
pub use send_window::SendWindow;
pub use session::{Handshake, HeartbeatTick, Session};
pub use state::{ConnectionState, SessionStatus};
