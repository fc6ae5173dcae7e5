//! Value objects

mod intents;
mod snowflake;

pub use intents::GatewayIntents;
pub use snowflake::{Snowflake, SnowflakeParseError};
