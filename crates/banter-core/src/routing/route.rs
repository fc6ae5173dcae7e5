//! Route descriptors
//!
//! A [`Route`] names an endpoint by its template (`/channels/{channel_id}/messages`),
//! carries the concrete path once parameters are substituted, and remembers the
//! values of the major parameters that partition the endpoint into separate
//! rate-limit buckets.

use super::{BucketId, HttpMethod};
use crate::error::RouteError;
use std::collections::BTreeMap;
use std::fmt;

/// Route parameters that partition an endpoint into independent buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MajorParameter {
    GuildId,
    ChannelId,
    WebhookId,
    WebhookToken,
}

impl MajorParameter {
    /// Placeholder name used in route templates
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::GuildId => "guild_id",
            Self::ChannelId => "channel_id",
            Self::WebhookId => "webhook_id",
            Self::WebhookToken => "webhook_token",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "guild_id" => Some(Self::GuildId),
            "channel_id" => Some(Self::ChannelId),
            "webhook_id" => Some(Self::WebhookId),
            "webhook_token" => Some(Self::WebhookToken),
            _ => None,
        }
    }
}

/// A REST endpoint plus the parameter values of one concrete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    method: HttpMethod,
    template: String,
    path: String,
    major: BTreeMap<MajorParameter, String>,
    bucket_hash: Option<String>,
}

impl Route {
    pub fn new(method: HttpMethod, template: impl Into<String>) -> Self {
        let template = template.into();
        Self {
            method,
            path: template.clone(),
            template,
            major: BTreeMap::new(),
            bucket_hash: None,
        }
    }

    pub fn get(template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, template)
    }

    pub fn post(template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, template)
    }

    pub fn put(template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, template)
    }

    pub fn patch(template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, template)
    }

    pub fn delete(template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, template)
    }

    /// Substitute `{key}` in the path with `value`
    ///
    /// Major parameters are also recorded for bucket partitioning.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl fmt::Display) -> Self {
        let value = value.to_string();
        self.path = self.path.replace(&format!("{{{key}}}"), &value);
        if let Some(major) = MajorParameter::from_key(key) {
            self.major.insert(major, value);
        }
        self
    }

    /// Attach a bucket hash already known for this endpoint
    #[must_use]
    pub fn with_bucket_hash(mut self, hash: impl Into<String>) -> Self {
        self.bucket_hash = Some(hash.into());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn bucket_hash(&self) -> Option<&str> {
        self.bucket_hash.as_deref()
    }

    pub fn major_parameter(&self, param: MajorParameter) -> Option<&str> {
        self.major.get(&param).map(String::as_str)
    }

    /// Method plus template, shared by every request to the same endpoint
    pub fn endpoint_key(&self) -> String {
        format!("{} {}", self.method, self.template)
    }

    /// Major parameter values in a stable order (`channel_id=1,guild_id=2` style)
    pub fn major_key(&self) -> String {
        self.major
            .iter()
            .map(|(param, value)| format!("{}={value}", param.key()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Bucket identity for this route
    ///
    /// `hash` takes precedence over the hash attached to the route, which takes
    /// precedence over the endpoint scope.
    pub fn bucket_id(&self, hash: Option<&str>) -> BucketId {
        match hash.or(self.bucket_hash.as_deref()) {
            Some(hash) => BucketId::hash(hash, self.major_key()),
            None => BucketId::endpoint(self.endpoint_key(), self.major_key()),
        }
    }

    /// Check that the template is well formed and every placeholder was substituted
    pub fn validate(&self) -> Result<(), RouteError> {
        if !self.template.starts_with('/') {
            return Err(RouteError::InvalidTemplate(self.template.clone()));
        }

        if let Some(start) = self.path.find('{') {
            let rest = &self.path[start + 1..];
            let param = rest.split('}').next().unwrap_or(rest);
            return Err(RouteError::UnresolvedParameter {
                template: self.template.clone(),
                param: param.to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
