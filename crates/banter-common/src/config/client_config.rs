//! Client configuration
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use banter_core::GatewayIntents;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Top-level client configuration
#[derive(Clone)]
pub struct ClientConfig {
    pub env: Environment,
    /// Bot token, sent as `Bot <token>` on REST and in Identify
    pub token: String,
    pub rest: RestSettings,
    pub gateway: GatewaySettings,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// REST client settings
#[derive(Debug, Clone)]
pub struct RestSettings {
    /// Base URL including the API version, without a trailing slash
    pub api_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    /// Retries for 502 responses
    pub max_retries: u32,
}

/// Gateway session settings
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub url: String,
    pub intents: GatewayIntents,
    /// `(shard_id, shard_count)`
    pub shard: Option<(u32, u32)>,
    pub large_threshold: u32,
    pub connect_timeout_ms: u64,
    pub reconnect_base_ms: u64,
    pub reconnect_max_ms: u64,
    /// Delay the first heartbeat by a random fraction of the interval
    pub heartbeat_jitter: bool,
    /// Frames per minute the client may send on one connection, heartbeats excluded
    pub send_limit: u32,
    /// Minimum spacing between two Identify frames
    pub identify_interval_ms: u64,
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_rest_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            intents: GatewayIntents::default(),
            shard: None,
            large_threshold: default_large_threshold(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_base_ms: default_reconnect_base_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            heartbeat_jitter: true,
            send_limit: default_send_limit(),
            identify_interval_ms: default_identify_interval_ms(),
        }
    }
}

// Default value functions
fn default_api_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_gateway_url() -> String {
    "wss://gateway.discord.gg/?v=10&encoding=json".to_string()
}

fn default_user_agent() -> String {
    format!(
        "DiscordBot (https://github.com/seung/banter, {})",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_rest_timeout_ms() -> u64 {
    15_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_large_threshold() -> u32 {
    50
}

fn default_connect_timeout_ms() -> u64 {
    30_000
}

fn default_reconnect_base_ms() -> u64 {
    1_000
}

fn default_reconnect_max_ms() -> u64 {
    60_000
}

// The gateway allows 120 frames a minute; a few are left for heartbeats
fn default_send_limit() -> u32 {
    117
}

fn default_identify_interval_ms() -> u64 {
    5_000
}

impl ClientConfig {
    /// Configuration with defaults for everything but the token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            env: Environment::default(),
            token: token.into(),
            rest: RestSettings::default(),
            gateway: GatewaySettings::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `BANTER_TOKEN` is missing or a variable has an invalid value
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("BANTER_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("BANTER_TOKEN"))?;

        let env = match lookup("BANTER_ENV") {
            Some(value) => Environment::parse(&value)
                .ok_or(ConfigError::InvalidValue("BANTER_ENV", value))?,
            None => Environment::default(),
        };

        let intents = match lookup("BANTER_INTENTS") {
            Some(value) => GatewayIntents::parse(&value)
                .map_err(|_| ConfigError::InvalidValue("BANTER_INTENTS", value))?,
            None => GatewayIntents::default(),
        };

        let shard = match (
            parse_var::<u32, _>(&lookup, "BANTER_SHARD_ID")?,
            parse_var::<u32, _>(&lookup, "BANTER_SHARD_COUNT")?,
        ) {
            (Some(id), Some(count)) if id < count => Some((id, count)),
            (None, None) => None,
            (id, count) => {
                return Err(ConfigError::InvalidValue(
                    "BANTER_SHARD_ID",
                    format!("shard {id:?} of {count:?}"),
                ))
            }
        };

        Ok(Self {
            env,
            token,
            rest: RestSettings {
                api_url: lookup("BANTER_API_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(default_api_url),
                user_agent: lookup("BANTER_USER_AGENT").unwrap_or_else(default_user_agent),
                timeout_ms: parse_var(&lookup, "BANTER_REST_TIMEOUT_MS")?
                    .unwrap_or_else(default_rest_timeout_ms),
                max_retries: parse_var(&lookup, "BANTER_REST_MAX_RETRIES")?
                    .unwrap_or_else(default_max_retries),
            },
            gateway: GatewaySettings {
                url: lookup("BANTER_GATEWAY_URL").unwrap_or_else(default_gateway_url),
                intents,
                shard,
                large_threshold: parse_var(&lookup, "BANTER_LARGE_THRESHOLD")?
                    .unwrap_or_else(default_large_threshold),
                connect_timeout_ms: parse_var(&lookup, "BANTER_CONNECT_TIMEOUT_MS")?
                    .unwrap_or_else(default_connect_timeout_ms),
                reconnect_base_ms: parse_var(&lookup, "BANTER_RECONNECT_BASE_MS")?
                    .unwrap_or_else(default_reconnect_base_ms),
                reconnect_max_ms: parse_var(&lookup, "BANTER_RECONNECT_MAX_MS")?
                    .unwrap_or_else(default_reconnect_max_ms),
                heartbeat_jitter: true,
                send_limit: match parse_var(&lookup, "BANTER_GATEWAY_SEND_LIMIT")? {
                    Some(0) => {
                        return Err(ConfigError::InvalidValue(
                            "BANTER_GATEWAY_SEND_LIMIT",
                            "0".to_string(),
                        ))
                    }
                    Some(limit) => limit,
                    None => default_send_limit(),
                },
                identify_interval_ms: parse_var(&lookup, "BANTER_IDENTIFY_INTERVAL_MS")?
                    .unwrap_or_else(default_identify_interval_ms),
            },
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key, value))
        })
        .transpose()
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("env", &self.env)
            .field("token", &"<redacted>")
            .field("rest", &self.rest)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
