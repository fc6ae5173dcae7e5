//! Gateway client configuration

use crate::protocol::{IdentifyPayload, IdentifyProperties, PresenceUpdatePayload};
use banter_common::GatewaySettings;
use banter_core::GatewayIntents;
use std::fmt;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// The gateway allows 120 frames a minute; a few are left for heartbeats
const DEFAULT_SEND_LIMIT: u32 = 117;
const DEFAULT_SEND_PERIOD: Duration = Duration::from_secs(60);
const DEFAULT_IDENTIFY_INTERVAL: Duration = Duration::from_secs(5);

/// Reconnect backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first reconnect attempt
    pub base: Duration,
    /// Upper bound for any delay
    pub max: Duration,
    /// Random spread added to or subtracted from each delay
    pub jitter: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(60),
            jitter: Duration::from_millis(250),
        }
    }
}

/// Everything a gateway session needs to authenticate and stay connected
#[derive(Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub token: String,
    pub intents: GatewayIntents,
    pub properties: IdentifyProperties,
    pub large_threshold: Option<u32>,
    /// `(shard_id, shard_count)`
    pub shard: Option<(u32, u32)>,
    pub compress: bool,
    /// Presence sent with Identify
    pub presence: Option<PresenceUpdatePayload>,
    /// Limit for opening the transport, and again for Ready or Resumed to arrive
    pub connect_timeout: Duration,
    pub backoff: BackoffConfig,
    /// Delay the first heartbeat of each connection by a random fraction of
    /// the interval
    pub heartbeat_jitter: bool,
    /// Frames sent per `send_period` on one connection; heartbeats are not counted
    pub send_limit: u32,
    pub send_period: Duration,
    /// Minimum spacing between two Identify frames, across reconnects
    pub identify_interval: Duration,
}

impl GatewayConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            intents: GatewayIntents::default(),
            properties: IdentifyProperties::default(),
            large_threshold: None,
            shard: None,
            compress: false,
            presence: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            backoff: BackoffConfig::default(),
            heartbeat_jitter: true,
            send_limit: DEFAULT_SEND_LIMIT,
            send_period: DEFAULT_SEND_PERIOD,
            identify_interval: DEFAULT_IDENTIFY_INTERVAL,
        }
    }

    pub fn from_settings(token: impl Into<String>, settings: &GatewaySettings) -> Self {
        let mut config = Self::new(settings.url.clone(), token).with_intents(settings.intents);
        config.large_threshold = Some(settings.large_threshold);
        config.shard = settings.shard;
        config.connect_timeout = Duration::from_millis(settings.connect_timeout_ms);
        config.backoff.base = Duration::from_millis(settings.reconnect_base_ms);
        config.backoff.max = Duration::from_millis(settings.reconnect_max_ms);
        config.heartbeat_jitter = settings.heartbeat_jitter;
        config.send_limit = settings.send_limit;
        config.identify_interval = Duration::from_millis(settings.identify_interval_ms);
        config
    }

    #[must_use]
    pub fn with_intents(mut self, intents: GatewayIntents) -> Self {
        self.intents = intents;
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: IdentifyProperties) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub fn with_large_threshold(mut self, threshold: u32) -> Self {
        self.large_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn with_shard(mut self, shard_id: u32, shard_count: u32) -> Self {
        self.shard = Some((shard_id, shard_count));
        self
    }

    #[must_use]
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    #[must_use]
    pub fn with_presence(mut self, presence: PresenceUpdatePayload) -> Self {
        self.presence = Some(presence);
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_heartbeat_jitter(mut self, enabled: bool) -> Self {
        self.heartbeat_jitter = enabled;
        self
    }

    #[must_use]
    pub fn with_send_limit(mut self, limit: u32, period: Duration) -> Self {
        self.send_limit = limit.max(1);
        self.send_period = period;
        self
    }

    #[must_use]
    pub fn with_identify_interval(mut self, interval: Duration) -> Self {
        self.identify_interval = interval;
        self
    }

    /// Identify payload for a fresh session
    pub fn identify_payload(&self) -> IdentifyPayload {
        let mut payload = IdentifyPayload::new(self.token.clone(), self.intents)
            .with_properties(self.properties.clone());

        if self.compress {
            payload = payload.with_compress(true);
        }
        if let Some(threshold) = self.large_threshold {
            payload = payload.with_large_threshold(threshold);
        }
        if let Some((id, count)) = self.shard {
            payload = payload.with_shard(id, count);
        }
        if let Some(presence) = &self.presence {
            payload = payload.with_presence(presence.clone());
        }
        payload
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("shard", &self.shard)
            .field("connect_timeout", &self.connect_timeout)
            .field("backoff", &self.backoff)
            .field("send_limit", &self.send_limit)
            .finish_non_exhaustive()
    }
}
