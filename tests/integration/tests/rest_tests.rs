//! REST client tests against the mock API
//!
//! Run with: cargo test -p integration-tests --test rest_tests

use std::time::{Duration, Instant};

use banter::{Client, ClientError, Route};
use banter_rest::{RateLimitEvent, RateLimiter, RestClient, RestError, RestRequest};
use integration_tests::{
    client_config, rest_config, unique_id, CreateMessage, MessageResponse, MockApi, MESSAGE_LIMIT,
    MESSAGE_WINDOW, TEST_TOKEN,
};
use serde_json::Value;

fn messages_route(channel_id: u64) -> Route {
    Route::post("/channels/{channel_id}/messages").param("channel_id", channel_id)
}

async fn setup() -> (MockApi, RestClient) {
    let api = MockApi::start().await.expect("Failed to start mock API");
    let client = RestClient::new(rest_config(&api.api_url()), RateLimiter::new())
        .expect("Failed to create REST client");
    (api, client)
}

// ============================================================================
// Requests
// ============================================================================

#[tokio::test]
async fn test_create_message_round_trip() {
    let (api, client) = setup().await;
    let channel_id = unique_id();

    let message: MessageResponse = client
        .post(messages_route(channel_id), &CreateMessage::new("hello"))
        .await
        .expect("Failed to create message");

    assert_eq!(message.channel_id, channel_id.to_string());
    assert_eq!(message.content, "hello");

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some(format!("Bot {TEST_TOKEN}").as_str())
    );
    assert_eq!(requests[0].body.as_ref().unwrap()["content"], "hello");
}

#[tokio::test]
async fn test_audit_log_reason_header() {
    let (api, client) = setup().await;
    let channel_id = unique_id();

    let request = RestRequest::new(
        Route::get("/channels/{channel_id}/messages").param("channel_id", channel_id),
    )
    .with_reason("cleanup");
    let value = client.execute(&request).await.unwrap();

    assert_eq!(value, Some(Value::Array(Vec::new())));
    assert_eq!(api.requests()[0].audit_reason.as_deref(), Some("cleanup"));
}

#[tokio::test]
async fn test_delete_returns_no_content() {
    let (api, client) = setup().await;
    let channel_id = unique_id();

    let route = Route::delete("/channels/{channel_id}/messages/{message_id}")
        .param("channel_id", channel_id)
        .param("message_id", 42);
    client.delete(route).await.expect("Delete should succeed");

    assert_eq!(api.hits(&format!("/channels/{channel_id}/messages/42")), 1);
}

#[tokio::test]
async fn test_unresolved_parameter_is_rejected_locally() {
    let (api, client) = setup().await;

    let err = client
        .get::<Value>(Route::get("/channels/{channel_id}/messages"))
        .await
        .unwrap_err();

    assert!(matches!(err, RestError::InvalidRoute(_)));
    assert!(api.requests().is_empty());
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_burst_is_throttled_without_429() {
    let (api, client) = setup().await;
    let channel_id = unique_id();
    let total = 5;

    let started = Instant::now();
    let tasks: Vec<_> = (0..total)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .post::<MessageResponse, _>(
                        messages_route(channel_id),
                        &CreateMessage::new(format!("burst {i}")),
                    )
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().expect("Request should succeed");
    }

    // Five requests at two per window span three windows
    assert!(started.elapsed() >= MESSAGE_WINDOW * 2);
    assert_eq!(api.overruns(), 0);
    assert_eq!(
        api.hits(&format!("/channels/{channel_id}/messages")),
        total
    );

    let snapshot = client
        .limiter()
        .bucket_snapshot(&messages_route(channel_id))
        .expect("Bucket should exist");
    assert_eq!(snapshot.limit, Some(MESSAGE_LIMIT));
}

#[tokio::test]
async fn test_channels_are_limited_independently() {
    let (api, client) = setup().await;
    let first = unique_id();
    let second = unique_id();

    let started = Instant::now();
    for channel_id in [first, first, second, second] {
        client
            .post::<MessageResponse, _>(messages_route(channel_id), &CreateMessage::new("hi"))
            .await
            .unwrap();
    }

    assert!(started.elapsed() < MESSAGE_WINDOW);
    assert_eq!(api.overruns(), 0);
}

#[tokio::test]
async fn test_route_429_is_retried() {
    let (api, client) = setup().await;
    let mut events = client.limiter().subscribe();

    let started = Instant::now();
    let value: Value = client.get(Route::get("/limited")).await.unwrap();

    assert_eq!(value["ok"], true);
    assert_eq!(api.hits("/limited"), 2);
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(client.limiter().global_cooldown().is_none());

    let mut route_limited = false;
    while let Ok(event) = events.try_recv() {
        route_limited |= matches!(event, RateLimitEvent::RouteLimited { .. });
    }
    assert!(route_limited);
}

#[tokio::test]
async fn test_global_429_pauses_every_route() {
    let (api, client) = setup().await;
    let mut events = client.limiter().subscribe();

    let started = Instant::now();
    let value: Value = client.get(Route::get("/global")).await.unwrap();

    assert_eq!(value["ok"], true);
    assert_eq!(api.hits("/global"), 2);
    assert!(started.elapsed() >= Duration::from_millis(300));

    let mut global_limited = false;
    while let Ok(event) = events.try_recv() {
        global_limited |= matches!(event, RateLimitEvent::GlobalLimited { .. });
    }
    assert!(global_limited);
}

#[tokio::test]
async fn test_shared_limiter_across_clients() {
    let api = MockApi::start().await.unwrap();
    let limiter = RateLimiter::new();
    let first = RestClient::new(rest_config(&api.api_url()), limiter.clone()).unwrap();
    let second = RestClient::new(rest_config(&api.api_url()), limiter.clone()).unwrap();
    let channel_id = unique_id();

    let started = Instant::now();
    for client in [&first, &second, &first] {
        client
            .post::<MessageResponse, _>(messages_route(channel_id), &CreateMessage::new("hi"))
            .await
            .unwrap();
    }

    assert!(started.elapsed() >= MESSAGE_WINDOW);
    assert_eq!(api.overruns(), 0);
}

// ============================================================================
// Errors and retries
// ============================================================================

#[tokio::test]
async fn test_bad_gateway_is_retried() {
    let (api, client) = setup().await;

    let value: Value = client.get(Route::get("/flaky")).await.unwrap();

    assert_eq!(value["ok"], true);
    assert_eq!(api.hits("/flaky"), 3);
}

#[tokio::test]
async fn test_bare_bad_gateway_on_limited_bucket_is_retried() {
    let (api, client) = setup().await;

    let first: Value = client.get(Route::get("/proxied")).await.unwrap();
    assert_eq!(first["ok"], true);

    // The retry must not wait on a window that no response will ever reset
    let second: Value = tokio::time::timeout(
        Duration::from_secs(5),
        client.get(Route::get("/proxied")),
    )
    .await
    .expect("request after a bare 502 completed")
    .unwrap();

    assert_eq!(second["ok"], true);
    assert_eq!(api.hits("/proxied"), 3);
}

#[tokio::test]
async fn test_bad_gateway_retries_are_bounded() {
    let api = MockApi::start_with_flaky_failures(10).await.unwrap();
    let client = RestClient::new(
        rest_config(&api.api_url()).with_max_retries(2),
        RateLimiter::new(),
    )
    .unwrap();

    let err = client.get::<Value>(Route::get("/flaky")).await.unwrap_err();

    assert!(matches!(err, RestError::RetriesExhausted { attempts: 3 }));
    assert!(err.is_transient());
    assert_eq!(api.hits("/flaky"), 3);
}

#[tokio::test]
async fn test_unauthorized_is_fatal() {
    let (api, client) = setup().await;

    let err = client
        .get::<Value>(Route::get("/users/@me"))
        .await
        .unwrap_err();

    assert!(matches!(err, RestError::Unauthorized));
    assert!(err.is_fatal());
    assert_eq!(api.hits("/users/@me"), 1);
}

#[tokio::test]
async fn test_api_error_body_is_surfaced() {
    let (_api, client) = setup().await;

    let err = client
        .get::<Value>(Route::get("/channels/{channel_id}").param("channel_id", 404))
        .await
        .unwrap_err();

    match err {
        RestError::Status {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 404);
            assert_eq!(code, Some(10003));
            assert_eq!(message, "Unknown Channel");
        }
        other => panic!("Expected status error, got {other:?}"),
    }
}

// ============================================================================
// Client façade
// ============================================================================

#[tokio::test]
async fn test_client_rest_through_facade() {
    let api = MockApi::start().await.unwrap();
    let client = Client::builder(client_config(&api.api_url(), "ws://127.0.0.1:1/gateway"))
        .build()
        .expect("Failed to build client");
    let channel_id = unique_id();

    let message: MessageResponse = client
        .rest()
        .post(messages_route(channel_id), &CreateMessage::new("from facade"))
        .await
        .unwrap();
    assert_eq!(message.content, "from facade");

    let err: ClientError = client
        .rest()
        .get::<Value>(Route::get("/users/@me"))
        .await
        .unwrap_err()
        .into();
    assert!(err.is_fatal());
}
