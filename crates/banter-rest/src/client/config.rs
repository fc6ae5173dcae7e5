//! REST client configuration

use banter_common::RestSettings;
use std::fmt;
use std::time::Duration;

/// Pause before retrying a 502, multiplied by the attempt number
const BAD_GATEWAY_DELAY: Duration = Duration::from_millis(750);

#[derive(Clone)]
pub struct RestConfig {
    /// Base URL including the API version, without a trailing slash
    pub api_url: String,
    pub token: String,
    pub user_agent: String,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Retries for 502 responses
    pub max_retries: u32,
    pub bad_gateway_delay: Duration,
}

impl RestConfig {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let settings = RestSettings::default();
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            user_agent: settings.user_agent,
            timeout: Duration::from_millis(settings.timeout_ms),
            max_retries: settings.max_retries,
            bad_gateway_delay: BAD_GATEWAY_DELAY,
        }
    }

    pub fn from_settings(token: impl Into<String>, settings: &RestSettings) -> Self {
        Self {
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            user_agent: settings.user_agent.clone(),
            timeout: Duration::from_millis(settings.timeout_ms),
            max_retries: settings.max_retries,
            bad_gateway_delay: BAD_GATEWAY_DELAY,
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_bad_gateway_delay(mut self, delay: Duration) -> Self {
        self.bad_gateway_delay = delay;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Value of the `Authorization` header
    pub fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }
}

impl fmt::Debug for RestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestConfig")
            .field("api_url", &self.api_url)
            .field("token", &"[redacted]")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let settings = RestSettings {
            api_url: "https://chat.example/api/v10/".to_string(),
            timeout_ms: 2_000,
            max_retries: 1,
            ..RestSettings::default()
        };

        let config = RestConfig::from_settings("abc", &settings);
        assert_eq!(config.api_url, "https://chat.example/api/v10");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.authorization(), "Bot abc");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = RestConfig::new("http://localhost", "secret-token");
        assert!(!format!("{config:?}").contains("secret-token"));
    }
}
