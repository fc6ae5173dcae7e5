//! Gateway session tests over a real WebSocket
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::{Duration, Instant};

use banter::Client;
use banter_gateway::protocol::PresenceUpdatePayload;
use banter_gateway::{
    ConnectionState, GatewayBuilder, GatewayClient, GatewayError, GatewayMessage, OpCode,
    SessionEvent,
};
use integration_tests::{
    client_config, eventually, gateway_config, unique_id, CreateMessage, MessageResponse,
    MockApi, MockGateway, TEST_SESSION_ID, TEST_TOKEN,
};
use tokio::sync::broadcast;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// Heartbeat interval long enough to stay out of the way
const QUIET_INTERVAL: u64 = 45_000;

async fn connect(gateway: &MockGateway) -> GatewayClient {
    let client = GatewayBuilder::new(gateway_config(&gateway.url())).build();
    client.connect().expect("Failed to start session");
    timeout(WAIT, client.wait_connected())
        .await
        .expect("Timed out waiting for the session")
        .expect("Session closed before connecting");
    client
}

async fn wait_for<F>(events: &mut broadcast::Receiver<SessionEvent>, matches: F) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("Session events closed"),
            }
        }
    })
    .await
    .expect("Timed out waiting for session event")
}

fn count(ops: &[OpCode], op: OpCode) -> usize {
    ops.iter().filter(|o| **o == op).count()
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_identify_and_dispatch() {
    let gateway = MockGateway::start(QUIET_INTERVAL).await.unwrap();
    let client = GatewayBuilder::new(gateway_config(&gateway.url())).build();
    let mut stream = client.subscribe();

    client.connect().unwrap();
    timeout(WAIT, client.wait_connected()).await.unwrap().unwrap();

    let status = client.status();
    assert_eq!(status.state, ConnectionState::Connected);
    assert_eq!(status.session_id.as_deref(), Some(TEST_SESSION_ID));

    let ready = timeout(WAIT, stream.recv()).await.unwrap().unwrap();
    assert_eq!(ready.name, "READY");

    let message = timeout(WAIT, stream.recv()).await.unwrap().unwrap();
    assert_eq!(message.name, "MESSAGE_CREATE");
    assert_eq!(message.data["content"], "welcome");
    assert!(message.sequence > ready.sequence);

    let received = gateway.received();
    assert_eq!(received[0].op, OpCode::Identify);
    assert_eq!(received[0].as_identify().unwrap().token, TEST_TOKEN);

    client.disconnect();
    timeout(WAIT, client.join()).await.unwrap().unwrap();
    assert_eq!(client.status().state, ConnectionState::Closed);
}

#[tokio::test]
async fn test_send_after_disconnect_fails() {
    let gateway = MockGateway::start(QUIET_INTERVAL).await.unwrap();
    let client = connect(&gateway).await;

    client.disconnect();
    timeout(WAIT, client.join()).await.unwrap().unwrap();

    let err = client
        .send(GatewayMessage::heartbeat(None))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Closed));
}

// ============================================================================
// Reconnection
// ============================================================================

#[tokio::test]
async fn test_resume_after_server_close() {
    let gateway = MockGateway::start(QUIET_INTERVAL).await.unwrap();
    let client = connect(&gateway).await;
    let mut events = client.session_events();

    assert_eq!(gateway.kick(4000), 1);

    let resumed = wait_for(&mut events, |e| matches!(e, SessionEvent::Resumed { .. })).await;
    assert!(matches!(
        resumed,
        SessionEvent::Resumed { ref session_id, .. } if session_id == TEST_SESSION_ID
    ));

    let resume = gateway
        .received()
        .into_iter()
        .find(|f| f.op == OpCode::Resume)
        .expect("Client should resume");
    let resume = resume.as_resume().unwrap();
    assert_eq!(resume.session_id, TEST_SESSION_ID);
    assert!(resume.seq >= 1);

    assert_eq!(gateway.connections(), 2);
    assert_eq!(count(&gateway.received_ops(), OpCode::Identify), 1);
    assert_eq!(client.status().state, ConnectionState::Connected);

    client.disconnect();
    timeout(WAIT, client.join()).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_reidentify_after_session_timeout() {
    let gateway = MockGateway::start(QUIET_INTERVAL).await.unwrap();
    let client = connect(&gateway).await;
    let mut events = client.session_events();

    gateway.kick(4009);

    wait_for(&mut events, |e| matches!(e, SessionEvent::Ready { .. })).await;
    let ops = gateway.received_ops();
    assert_eq!(count(&ops, OpCode::Identify), 2);
    assert_eq!(count(&ops, OpCode::Resume), 0);

    client.disconnect();
    timeout(WAIT, client.join()).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_fatal_close_ends_session() {
    let gateway = MockGateway::start(QUIET_INTERVAL).await.unwrap();
    let client = connect(&gateway).await;

    gateway.kick(4004);

    let err = timeout(WAIT, client.join()).await.unwrap().unwrap_err();
    assert!(matches!(err, GatewayError::AuthenticationFailed));
    assert!(err.is_fatal());
    assert_eq!(client.status().state, ConnectionState::Closed);
    assert_eq!(gateway.connections(), 1);
}

// ============================================================================
// Heartbeat
// ============================================================================

#[tokio::test]
async fn test_heartbeats_are_acknowledged() {
    let gateway = MockGateway::start(100).await.unwrap();
    let client = connect(&gateway).await;

    let beating = eventually(WAIT, || {
        count(&gateway.received_ops(), OpCode::Heartbeat) >= 3
    })
    .await;
    assert!(beating);

    let status = client.status();
    assert_eq!(status.state, ConnectionState::Connected);
    assert!(status.latency.is_some());
    assert_eq!(gateway.connections(), 1);

    client.disconnect();
    timeout(WAIT, client.join()).await.unwrap().unwrap();
}

// ============================================================================
// Send limits
// ============================================================================

#[tokio::test]
async fn test_presence_updates_are_throttled() {
    let gateway = MockGateway::start(QUIET_INTERVAL).await.unwrap();
    let config = gateway_config(&gateway.url()).with_send_limit(3, Duration::from_millis(300));
    let client = GatewayBuilder::new(config).build();
    client.connect().unwrap();
    timeout(WAIT, client.wait_connected()).await.unwrap().unwrap();

    let start = Instant::now();
    let presence = PresenceUpdatePayload::new("idle");
    for _ in 0..4 {
        timeout(WAIT, client.update_presence(&presence))
            .await
            .unwrap()
            .unwrap();
    }

    // Identify took one of three slots, so the third update waits for the next window
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert!(
        eventually(WAIT, || {
            count(&gateway.received_ops(), OpCode::PresenceUpdate) == 4
        })
        .await
    );
    assert_eq!(gateway.connections(), 1);

    client.disconnect();
    timeout(WAIT, client.join()).await.unwrap().unwrap();
}

// ============================================================================
// Client façade
// ============================================================================

#[tokio::test]
async fn test_client_start_and_shutdown() {
    let api = MockApi::start().await.unwrap();
    let gateway = MockGateway::start(QUIET_INTERVAL).await.unwrap();
    let client = Client::builder(client_config(&api.api_url(), &gateway.url()))
        .build()
        .unwrap();

    timeout(WAIT, client.start()).await.unwrap().unwrap();
    assert_eq!(
        client.gateway().status().session_id.as_deref(),
        Some(TEST_SESSION_ID)
    );

    let message: MessageResponse = client
        .rest()
        .post(
            banter::Route::post("/channels/{channel_id}/messages").param("channel_id", unique_id()),
            &CreateMessage::new("connected"),
        )
        .await
        .unwrap();
    assert_eq!(message.content, "connected");

    timeout(WAIT, client.shutdown()).await.unwrap().unwrap();
    assert_eq!(client.gateway().status().state, ConnectionState::Closed);
}
