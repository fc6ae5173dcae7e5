//! Route errors - raised when a route descriptor cannot be turned into a request path

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Unresolved route parameter `{param}` in {template}")]
    UnresolvedParameter { template: String, param: String },

    #[error("Route template must start with '/': {0}")]
    InvalidTemplate(String),
}
