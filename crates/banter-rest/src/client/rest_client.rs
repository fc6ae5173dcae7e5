//! Rate-limited REST client

use super::{RestConfig, RestRequest};
use crate::error::{RestError, RestResult};
use crate::ratelimit::RateLimiter;
use banter_core::{HttpMethod, RateLimitInfo, Route};
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

const AUDIT_LOG_REASON: &str = "x-audit-log-reason";

/// Used when a 429 carries neither a body nor a `Retry-After` header
const FALLBACK_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Body of a 429 response
#[derive(Debug, Default, Deserialize)]
struct RateLimitedBody {
    retry_after: Option<f64>,
    #[serde(default)]
    global: bool,
}

/// Body of any other error response
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<u64>,
    message: Option<String>,
}

/// REST client
///
/// Cheap to clone; clones share the HTTP connection pool and the rate limiter.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    config: Arc<RestConfig>,
    limiter: RateLimiter,
}

impl RestClient {
    pub fn new(config: RestConfig, limiter: RateLimiter) -> RestResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
            limiter,
        })
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Send a request, waiting out rate limits and retrying 429 and 502 responses
    ///
    /// Returns `None` for `204 No Content` and empty bodies.
    pub async fn execute(&self, request: &RestRequest) -> RestResult<Option<Value>> {
        request.route.validate()?;

        let url = format!("{}{}", self.config.api_url, request.route.path());
        let mut bad_gateways = 0u32;

        loop {
            let contract = self.limiter.acquire_contract(&request.route).await;
            let handle = contract.enter_request_phase().await?;

            trace!(route = %request.route, bucket = %contract.bucket_id(), "Sending request");

            // Hand the request to the connection pool before the next one may
            // pass the gate; the gate is not held for the response.
            let pending = self.build(request, &url).send();
            tokio::pin!(pending);
            let first_poll = futures::poll!(pending.as_mut());
            drop(handle);

            let sent = match first_poll {
                Poll::Ready(result) => result,
                Poll::Pending => pending.await,
            };

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    if e.is_connect() || e.is_builder() {
                        contract.cancel_unsent();
                    } else {
                        contract.cancel();
                    }
                    warn!(route = %request.route, error = %e, "Request failed");
                    return Err(RestError::Transport(e));
                }
            };

            let status = response.status();
            let info = RateLimitInfo::from_headers(|name| {
                response
                    .headers()
                    .get(name)
                    .and_then(|value| value.to_str().ok())
            });

            let body = match response.bytes().await {
                Ok(body) => body,
                Err(e) => {
                    contract.complete(info);
                    return Err(RestError::Transport(e));
                }
            };

            match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    let limited: RateLimitedBody = serde_json::from_slice(&body).unwrap_or_default();
                    let retry_after = limited
                        .retry_after
                        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                        .or(info.retry_after)
                        .unwrap_or(FALLBACK_RETRY_AFTER);

                    if limited.global || info.global {
                        warn!(
                            route = %request.route,
                            retry_after_ms = retry_after.as_millis(),
                            "Hit global rate limit"
                        );
                        self.limiter.trigger_global_limit(Instant::now() + retry_after);
                        contract.cancel();
                    } else {
                        warn!(
                            route = %request.route,
                            bucket = %contract.bucket_id(),
                            retry_after_ms = retry_after.as_millis(),
                            "Hit route rate limit"
                        );
                        contract.complete(info.exhausted(retry_after));
                    }
                }
                StatusCode::BAD_GATEWAY => {
                    // Proxies answer 502 without rate-limit headers
                    if info.is_empty() {
                        contract.cancel();
                    } else {
                        contract.complete(info);
                    }
                    bad_gateways += 1;
                    if bad_gateways > self.config.max_retries {
                        return Err(RestError::RetriesExhausted {
                            attempts: bad_gateways,
                        });
                    }

                    let delay = self.config.bad_gateway_delay * bad_gateways;
                    debug!(
                        route = %request.route,
                        attempt = bad_gateways,
                        delay_ms = delay.as_millis(),
                        "Bad gateway, retrying"
                    );
                    time::sleep(delay).await;
                }
                StatusCode::UNAUTHORIZED => {
                    contract.complete(info);
                    warn!(route = %request.route, "Token rejected");
                    return Err(RestError::Unauthorized);
                }
                status if status.is_success() => {
                    contract.complete(info);
                    if status == StatusCode::NO_CONTENT || body.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(serde_json::from_slice(&body)?));
                }
                status => {
                    contract.complete(info);
                    let error: ApiErrorBody = serde_json::from_slice(&body).unwrap_or_default();
                    let message = error
                        .message
                        .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());

                    debug!(route = %request.route, status = status.as_u16(), %message, "Request rejected");
                    return Err(RestError::Status {
                        status: status.as_u16(),
                        code: error.code,
                        message,
                    });
                }
            }
        }
    }

    /// Execute and decode the response body; an empty body decodes from `null`
    pub async fn request<T: DeserializeOwned>(&self, request: &RestRequest) -> RestResult<T> {
        let value = self.execute(request).await?.unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, route: Route) -> RestResult<T> {
        self.request(&RestRequest::new(route)).await
    }

    pub async fn post<T, B>(&self, route: Route, body: &B) -> RestResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(&RestRequest::new(route).with_json(body)?).await
    }

    pub async fn patch<T, B>(&self, route: Route, body: &B) -> RestResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(&RestRequest::new(route).with_json(body)?).await
    }

    pub async fn put<T: DeserializeOwned>(&self, route: Route) -> RestResult<T> {
        self.request(&RestRequest::new(route)).await
    }

    /// Delete a resource, ignoring any response body
    pub async fn delete(&self, route: Route) -> RestResult<()> {
        self.execute(&RestRequest::new(route)).await.map(|_| ())
    }

    fn build(&self, request: &RestRequest, url: &str) -> reqwest::RequestBuilder {
        let method = match request.route.method() {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .http
            .request(method, url)
            .header(header::AUTHORIZATION, self.config.authorization());

        if let Some(reason) = &request.reason {
            builder = builder.header(AUDIT_LOG_REASON, reason.as_str());
        }

        match &request.body {
            Some(body) => builder.json(body),
            None if request.route.method().has_body() => {
                builder.header(header::CONTENT_LENGTH, 0)
            }
            None => builder,
        }
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .finish()
    }
}
