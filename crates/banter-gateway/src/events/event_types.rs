//! Well-known dispatch event names
//!
//! Dispatch events are delivered by name, so unknown names still reach
//! subscribers. This enum only names the common ones.

use banter_core::GatewayIntents;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEventType {
    Ready,
    Resumed,
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    GuildMembersChunk,
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    MessageReactionAdd,
    MessageReactionRemove,
    PresenceUpdate,
    TypingStart,
    VoiceStateUpdate,
    UserUpdate,
    InteractionCreate,
}

/// Wire name of every variant
const NAMES: &[(GatewayEventType, &str)] = &[
    (GatewayEventType::Ready, "READY"),
    (GatewayEventType::Resumed, "RESUMED"),
    (GatewayEventType::GuildCreate, "GUILD_CREATE"),
    (GatewayEventType::GuildUpdate, "GUILD_UPDATE"),
    (GatewayEventType::GuildDelete, "GUILD_DELETE"),
    (GatewayEventType::GuildMembersChunk, "GUILD_MEMBERS_CHUNK"),
    (GatewayEventType::GuildMemberAdd, "GUILD_MEMBER_ADD"),
    (GatewayEventType::GuildMemberUpdate, "GUILD_MEMBER_UPDATE"),
    (GatewayEventType::GuildMemberRemove, "GUILD_MEMBER_REMOVE"),
    (GatewayEventType::ChannelCreate, "CHANNEL_CREATE"),
    (GatewayEventType::ChannelUpdate, "CHANNEL_UPDATE"),
    (GatewayEventType::ChannelDelete, "CHANNEL_DELETE"),
    (GatewayEventType::MessageCreate, "MESSAGE_CREATE"),
    (GatewayEventType::MessageUpdate, "MESSAGE_UPDATE"),
    (GatewayEventType::MessageDelete, "MESSAGE_DELETE"),
    (GatewayEventType::MessageReactionAdd, "MESSAGE_REACTION_ADD"),
    (GatewayEventType::MessageReactionRemove, "MESSAGE_REACTION_REMOVE"),
    (GatewayEventType::PresenceUpdate, "PRESENCE_UPDATE"),
    (GatewayEventType::TypingStart, "TYPING_START"),
    (GatewayEventType::VoiceStateUpdate, "VOICE_STATE_UPDATE"),
    (GatewayEventType::UserUpdate, "USER_UPDATE"),
    (GatewayEventType::InteractionCreate, "INTERACTION_CREATE"),
];

impl GatewayEventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or("UNKNOWN", |(_, name)| name)
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(kind, _)| *kind)
    }

    /// Intents of which at least one must be identified with to receive this event
    ///
    /// Empty for events every session receives.
    pub fn intents(self) -> GatewayIntents {
        use GatewayIntents as I;

        match self {
            Self::Ready | Self::Resumed | Self::UserUpdate | Self::InteractionCreate => {
                I::empty()
            }
            Self::GuildCreate
            | Self::GuildUpdate
            | Self::GuildDelete
            | Self::ChannelCreate
            | Self::ChannelUpdate
            | Self::ChannelDelete => I::GUILDS,
            // Chunks answer an explicit request
            Self::GuildMembersChunk => I::empty(),
            Self::GuildMemberAdd | Self::GuildMemberUpdate | Self::GuildMemberRemove => {
                I::GUILD_MEMBERS
            }
            Self::MessageCreate | Self::MessageUpdate | Self::MessageDelete => {
                I::GUILD_MESSAGES | I::DIRECT_MESSAGES
            }
            Self::MessageReactionAdd | Self::MessageReactionRemove => {
                I::GUILD_MESSAGE_REACTIONS | I::DIRECT_MESSAGE_REACTIONS
            }
            Self::TypingStart => I::GUILD_MESSAGE_TYPING | I::DIRECT_MESSAGE_TYPING,
            Self::PresenceUpdate => I::GUILD_PRESENCES,
            Self::VoiceStateUpdate => I::GUILD_VOICE_STATES,
        }
    }

    /// Whether a session identified with `intents` receives this event
    pub fn is_enabled_by(self, intents: GatewayIntents) -> bool {
        let required = self.intents();
        required.is_empty() || intents.intersects(required)
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<GatewayEventType> for String {
    fn from(event: GatewayEventType) -> Self {
        event.as_str().to_string()
    }
}
