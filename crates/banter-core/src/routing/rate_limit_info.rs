//! Rate-limit data reported by a REST response

use std::time::Duration;

/// Rate-limit headers of one response, all optional
///
/// An empty value (no limit, remaining or reset) means the endpoint is not
/// rate limited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitInfo {
    /// Requests allowed per window
    pub limit: Option<u32>,
    /// Requests left in the current window
    pub remaining: Option<u32>,
    /// Time until the window resets
    pub reset_after: Option<Duration>,
    /// Server-assigned bucket hash
    pub bucket: Option<String>,
    /// The response hit the global limit
    pub global: bool,
    /// `user`, `global` or `shared`
    pub scope: Option<String>,
    /// Wait requested by a 429 response
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    pub const LIMIT_HEADER: &'static str = "x-ratelimit-limit";
    pub const REMAINING_HEADER: &'static str = "x-ratelimit-remaining";
    pub const RESET_HEADER: &'static str = "x-ratelimit-reset";
    pub const RESET_AFTER_HEADER: &'static str = "x-ratelimit-reset-after";
    pub const BUCKET_HEADER: &'static str = "x-ratelimit-bucket";
    pub const GLOBAL_HEADER: &'static str = "x-ratelimit-global";
    pub const SCOPE_HEADER: &'static str = "x-ratelimit-scope";
    pub const RETRY_AFTER_HEADER: &'static str = "retry-after";

    /// Build from response headers
    ///
    /// `header` looks up a lowercase header name. `X-RateLimit-Reset` (epoch
    /// seconds) is only used when `X-RateLimit-Reset-After` is missing.
    pub fn from_headers<'a, F>(header: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let reset_after = header(Self::RESET_AFTER_HEADER)
            .and_then(parse_seconds)
            .or_else(|| header(Self::RESET_HEADER).and_then(reset_from_epoch));

        Self {
            limit: header(Self::LIMIT_HEADER).and_then(|v| v.trim().parse().ok()),
            remaining: header(Self::REMAINING_HEADER).and_then(|v| v.trim().parse().ok()),
            reset_after,
            bucket: header(Self::BUCKET_HEADER)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from),
            global: header(Self::GLOBAL_HEADER)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
            scope: header(Self::SCOPE_HEADER).map(|v| v.trim().to_string()),
            retry_after: header(Self::RETRY_AFTER_HEADER).and_then(parse_seconds),
        }
    }

    /// No bucket data at all
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.remaining.is_none() && self.reset_after.is_none()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Turn the info of a per-route 429 into "no requests left until `retry_after`"
    #[must_use]
    pub fn exhausted(mut self, retry_after: Duration) -> Self {
        self.remaining = Some(0);
        self.reset_after = Some(self.reset_after.map_or(retry_after, |r| r.max(retry_after)));
        self.retry_after = Some(retry_after);
        self
    }
}

fn parse_seconds(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

fn reset_from_epoch(value: &str) -> Option<Duration> {
    let reset_ms = value.trim().parse::<f64>().ok()? * 1000.0;
    let now_ms = chrono::Utc::now().timestamp_millis() as f64;
    Some(Duration::from_millis((reset_ms - now_ms).max(0.0) as u64))
}
