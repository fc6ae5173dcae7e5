//! Gateway protocol definitions
//!
//! Op codes, close codes, the frame format and payloads.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::{CloseAction, CloseCode, NORMAL_CLOSURE, RECONNECT_CLOSURE};
pub use messages::{GatewayMessage, READY_EVENT, RESUMED_EVENT};
pub use opcodes::{Direction, OpCode};
pub use payloads::{
    HelloPayload, IdentifyPayload, IdentifyProperties, PresenceUpdatePayload, ReadyPayload,
    RequestGuildMembersPayload, ResumePayload, VoiceStateUpdatePayload,
};
