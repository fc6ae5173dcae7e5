//! Fan-out of dispatch events to subscribers

mod dispatcher;

pub use dispatcher::{EventDispatcher, EventStream};
