//! One REST call: route, optional JSON body and audit-log reason

use banter_core::Route;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct RestRequest {
    pub route: Route,
    pub body: Option<Value>,
    /// Sent as `X-Audit-Log-Reason`
    pub reason: Option<String>,
}

impl RestRequest {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            body: None,
            reason: None,
        }
    }

    /// Attach a JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON body
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, serde_json::Error> {
        Ok(self.with_body(serde_json::to_value(body)?))
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl From<Route> for RestRequest {
    fn from(route: Route) -> Self {
        Self::new(route)
    }
}
