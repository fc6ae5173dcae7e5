//! Rate-limit bucket identity

use std::fmt;

/// What a bucket is keyed on before major parameters are applied
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketScope {
    /// Method + route template, used until the server reveals a hash
    Endpoint(String),
    /// Server-assigned hash shared by every endpoint in the same bucket
    Hash(String),
}

/// Identity of one rate-limit bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketId {
    scope: BucketScope,
    major: String,
}

impl BucketId {
    pub fn endpoint(endpoint: impl Into<String>, major: impl Into<String>) -> Self {
        Self {
            scope: BucketScope::Endpoint(endpoint.into()),
            major: major.into(),
        }
    }

    pub fn hash(hash: impl Into<String>, major: impl Into<String>) -> Self {
        Self {
            scope: BucketScope::Hash(hash.into()),
            major: major.into(),
        }
    }

    pub fn scope(&self) -> &BucketScope {
        &self.scope
    }

    pub fn major(&self) -> &str {
        &self.major
    }

    pub fn is_hash(&self) -> bool {
        matches!(self.scope, BucketScope::Hash(_))
    }

    /// Same major parameters, hash scope
    #[must_use]
    pub fn with_hash(&self, hash: impl Into<String>) -> Self {
        Self::hash(hash, self.major.clone())
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            BucketScope::Endpoint(endpoint) => write!(f, "{endpoint}")?,
            BucketScope::Hash(hash) => write!(f, "hash:{hash}")?,
        }
        if !self.major.is_empty() {
            write!(f, " [{}]", self.major)?;
        }
        Ok(())
    }
}
