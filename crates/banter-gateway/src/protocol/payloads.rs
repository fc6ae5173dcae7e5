//! Payload definitions
//!
//! The `d` field of frames, for the opcodes the session sends or interprets.

use banter_core::{GatewayIntents, Snowflake};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload for op 10 (Hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub properties: IdentifyProperties,
    pub intents: GatewayIntents,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
    /// Member count above which offline members are not sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_threshold: Option<u32>,
    /// `[shard_id, shard_count]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceUpdatePayload>,
}

impl IdentifyPayload {
    pub fn new(token: impl Into<String>, intents: GatewayIntents) -> Self {
        Self {
            token: token.into(),
            properties: IdentifyProperties::default(),
            intents,
            compress: None,
            large_threshold: None,
            shard: None,
            presence: None,
        }
    }

    #[must_use]
    pub fn with_properties(mut self, properties: IdentifyProperties) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    #[must_use]
    pub fn with_large_threshold(mut self, threshold: u32) -> Self {
        self.large_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn with_shard(mut self, shard_id: u32, shard_count: u32) -> Self {
        self.shard = Some([shard_id, shard_count]);
        self
    }

    #[must_use]
    pub fn with_presence(mut self, presence: PresenceUpdatePayload) -> Self {
        self.presence = Some(presence);
        self
    }
}

/// Connection properties sent in Identify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    /// Library name
    pub browser: String,
    pub device: String,
}

impl IdentifyProperties {
    pub fn new(
        os: impl Into<String>,
        browser: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            os: os.into(),
            browser: browser.into(),
            device: device.into(),
        }
    }
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self::new(std::env::consts::OS, "banter", "banter")
    }
}

/// Payload for op 6 (Resume)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    /// Last sequence number received
    pub seq: u64,
}

/// Payload for op 3 (Presence Update), also the initial presence in Identify
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdatePayload {
    /// Unix time in milliseconds since the client went idle
    pub since: Option<u64>,
    #[serde(default)]
    pub activities: Vec<Value>,
    pub status: String,
    #[serde(default)]
    pub afk: bool,
}

impl PresenceUpdatePayload {
    pub const VALID_STATUSES: &'static [&'static str] =
        &["online", "dnd", "idle", "invisible", "offline"];

    pub fn new(status: impl Into<String>) -> Self {
        Self {
            since: None,
            activities: Vec::new(),
            status: status.into(),
            afk: false,
        }
    }

    #[must_use]
    pub fn with_activity(mut self, activity: Value) -> Self {
        self.activities.push(activity);
        self
    }

    #[must_use]
    pub fn with_afk(mut self, since: u64) -> Self {
        self.afk = true;
        self.since = Some(since);
        self
    }

    #[must_use]
    pub fn is_valid_status(&self) -> bool {
        Self::VALID_STATUSES.contains(&self.status.as_str())
    }
}

/// Payload for op 4 (Voice State Update)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateUpdatePayload {
    pub guild_id: Snowflake,
    /// `None` leaves the voice channel
    pub channel_id: Option<Snowflake>,
    pub self_mute: bool,
    pub self_deaf: bool,
}

/// Payload for op 8 (Request Guild Members)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestGuildMembersPayload {
    pub guild_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Maximum members to send, 0 for all matching
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presences: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<Snowflake>>,
    /// Echoed back in the Guild Members Chunk events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl RequestGuildMembersPayload {
    /// Members whose username starts with `query`; an empty query matches everyone
    pub fn query(guild_id: Snowflake, query: impl Into<String>, limit: u32) -> Self {
        Self {
            guild_id,
            query: Some(query.into()),
            limit,
            presences: None,
            user_ids: None,
            nonce: None,
        }
    }

    pub fn users(guild_id: Snowflake, user_ids: Vec<Snowflake>) -> Self {
        Self {
            guild_id,
            query: None,
            limit: 0,
            presences: None,
            user_ids: Some(user_ids),
            nonce: None,
        }
    }

    #[must_use]
    pub fn with_presences(mut self) -> Self {
        self.presences = Some(true);
        self
    }

    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

/// The session-relevant part of the Ready dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyPayload {
    /// Gateway version
    #[serde(default)]
    pub v: u8,
    pub session_id: String,
    /// Host to use when resuming this session
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
    #[serde(default)]
    pub shard: Option<[u32; 2]>,
}
