//! Events delivered to observers of a gateway session

mod dispatch_event;
mod event_types;
mod session_event;

pub use dispatch_event::DispatchEvent;
pub use event_types::GatewayEventType;
pub use session_event::SessionEvent;
