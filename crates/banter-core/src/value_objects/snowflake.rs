//! Snowflake identifiers
//!
//! 64-bit ids: a 42-bit millisecond timestamp since [`Snowflake::EPOCH`], then
//! 5 bits of worker id, 5 bits of process id and a 12-bit increment.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const TIMESTAMP_SHIFT: u32 = 22;

/// Platform-issued 64-bit identifier
///
/// Route major parameters (guild, channel, webhook ids) are usually snowflakes,
/// which is why [`Route::param`](crate::Route::param) accepts anything `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(u64);

impl Snowflake {
    /// 2015-01-01 00:00:00 UTC in Unix milliseconds
    pub const EPOCH: u64 = 1_420_070_400_000;

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Smallest id created at `unix_ms`
    ///
    /// Useful as a `before`/`after` bound when paginating by time. Times
    /// before the epoch clamp to zero.
    pub const fn from_timestamp(unix_ms: u64) -> Self {
        Self(unix_ms.saturating_sub(Self::EPOCH) << TIMESTAMP_SHIFT)
    }

    /// Creation time in Unix milliseconds
    pub const fn timestamp(self) -> u64 {
        (self.0 >> TIMESTAMP_SHIFT) + Self::EPOCH
    }

    pub fn created_at(self) -> Option<chrono::DateTime<chrono::Utc>> {
        use chrono::TimeZone;

        let ms = i64::try_from(self.timestamp()).ok()?;
        chrono::Utc.timestamp_millis_opt(ms).single()
    }

    pub const fn worker_id(self) -> u8 {
        ((self.0 >> 17) & 0x1f) as u8
    }

    pub const fn process_id(self) -> u8 {
        ((self.0 >> 12) & 0x1f) as u8
    }

    pub const fn increment(self) -> u16 {
        (self.0 & 0xfff) as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid snowflake: expected an unsigned 64-bit integer")]
pub struct SnowflakeParseError;

impl FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self).map_err(|_| SnowflakeParseError)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for u64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

// Ids go over the wire as strings; integers are accepted on input
impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(id) => Ok(Self(id)),
            Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
