//! Gateway frame format

use super::{
    HelloPayload, IdentifyPayload, OpCode, PresenceUpdatePayload, ReadyPayload,
    RequestGuildMembersPayload, ResumePayload, VoiceStateUpdatePayload,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name of the dispatch that completes Identify
pub const READY_EVENT: &str = "READY";

/// Event name of the dispatch that completes Resume
pub const RESUMED_EVENT: &str = "RESUMED";

/// One gateway frame
///
/// Every message on the connection is a JSON object of this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: OpCode,

    /// Event name (Dispatch only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (Dispatch only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    #[serde(default)]
    pub d: Option<Value>,
}

impl GatewayMessage {
    fn new(op: OpCode, d: Option<Value>) -> Self {
        Self {
            op,
            t: None,
            s: None,
            d,
        }
    }

    fn with_payload<T: Serialize>(op: OpCode, payload: &T) -> Self {
        Self::new(op, Some(serde_json::to_value(payload).unwrap_or_default()))
    }

    // === Client frames ===

    /// Heartbeat (op 1) carrying the last sequence number received
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::new(OpCode::Heartbeat, Some(last_sequence.map_or(Value::Null, Value::from)))
    }

    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self::with_payload(OpCode::Identify, payload)
    }

    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self::with_payload(OpCode::Resume, payload)
    }

    #[must_use]
    pub fn presence_update(payload: &PresenceUpdatePayload) -> Self {
        Self::with_payload(OpCode::PresenceUpdate, payload)
    }

    #[must_use]
    pub fn voice_state_update(payload: &VoiceStateUpdatePayload) -> Self {
        Self::with_payload(OpCode::VoiceStateUpdate, payload)
    }

    #[must_use]
    pub fn request_guild_members(payload: &RequestGuildMembersPayload) -> Self {
        Self::with_payload(OpCode::RequestGuildMembers, payload)
    }

    // === Server frames ===

    #[must_use]
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self::with_payload(OpCode::Hello, &HelloPayload::with_interval(heartbeat_interval))
    }

    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::new(OpCode::HeartbeatAck, None)
    }

    #[must_use]
    pub fn reconnect() -> Self {
        Self::new(OpCode::Reconnect, None)
    }

    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self::new(OpCode::InvalidSession, Some(Value::Bool(resumable)))
    }

    // === Parsing ===

    fn payload<T: DeserializeOwned>(&self, op: OpCode) -> Option<T> {
        if self.op != op {
            return None;
        }
        self.d
            .as_ref()
            .and_then(|d| T::deserialize(d).ok())
    }

    pub fn as_hello(&self) -> Option<HelloPayload> {
        self.payload(OpCode::Hello)
    }

    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        self.payload(OpCode::Identify)
    }

    pub fn as_resume(&self) -> Option<ResumePayload> {
        self.payload(OpCode::Resume)
    }

    pub fn as_presence_update(&self) -> Option<PresenceUpdatePayload> {
        self.payload(OpCode::PresenceUpdate)
    }

    /// Ready dispatch payload
    pub fn as_ready(&self) -> Option<ReadyPayload> {
        if self.event_name() != Some(READY_EVENT) {
            return None;
        }
        self.payload(OpCode::Dispatch)
    }

    /// Resumable flag of an Invalid Session frame; a missing flag means `false`
    pub fn as_invalid_session(&self) -> Option<bool> {
        if self.op != OpCode::InvalidSession {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    /// Sequence number carried by a Heartbeat frame
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        if self.op != OpCode::Heartbeat {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_u64))
    }

    pub fn event_name(&self) -> Option<&str> {
        self.t.as_deref()
    }

    // === Utilities ===

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Binary frames carry the same JSON as UTF-8 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
