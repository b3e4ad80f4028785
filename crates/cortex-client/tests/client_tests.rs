//! Client tests against a live bridge

use cortex_client::{ClientConfig, ClientError, ClientEvent, ConnectionState, CortexClient};
use cortex_core::{Arg, Message};
use cortex_test_utils::{find_available_port, TestBridge, DEFAULT_TIMEOUT};
use cortex_transport::{TransportSender, TransportServer, WebSocketServer};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const RETRY: Duration = Duration::from_millis(100);

async fn next_message(events: &mut mpsc::Receiver<ClientEvent>) -> Message {
    timeout(DEFAULT_TIMEOUT, async {
        loop {
            if let Some(ClientEvent::Message(msg)) = events.recv().await {
                return msg;
            }
        }
    })
    .await
    .expect("no message received")
}

#[tokio::test]
async fn test_connects_and_receives() {
    let bridge = TestBridge::start().await;
    let (client, mut events) = CortexClient::spawn(ClientConfig::new(bridge.ws_url()));

    assert!(client.wait_connected(DEFAULT_TIMEOUT).await);
    assert!(bridge.wait_for_clients(1).await);

    bridge
        .emit(&Message::new("/brahma/organism/update").arg("p1").arg(0.25f32))
        .await;

    let msg = next_message(&mut events).await;
    assert_eq!(msg.address, "/brahma/organism/update");
    assert_eq!(msg.args, vec![Arg::String("p1".to_string()), Arg::Float(0.25)]);

    client.close().await;
}

#[tokio::test]
async fn test_send_plain_and_typed() {
    let bridge = TestBridge::start().await;
    let (client, _events) = CortexClient::spawn(ClientConfig::new(bridge.ws_url()));
    assert!(client.wait_connected(DEFAULT_TIMEOUT).await);

    client
        .send("/daemon/lorenz/create", vec!["lorenz1".into(), 10.into(), 2.5.into()])
        .await
        .unwrap();
    let msg = bridge.engine().recv(DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(msg.type_tags(), "sif");

    client
        .send_message(&Message::new("/daemon/lorenz/set").arg(1.0f32).arg(2.0f64))
        .await
        .unwrap();
    let msg = bridge.engine().recv(DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(msg.args, vec![Arg::Float(1.0), Arg::Double(2.0)]);

    client.close().await;
}

#[tokio::test]
async fn test_state_events() {
    let bridge = TestBridge::start().await;
    let (client, mut events) =
        CortexClient::spawn(ClientConfig::new(bridge.ws_url()).retry_interval(RETRY));

    let first = timeout(DEFAULT_TIMEOUT, events.recv()).await.unwrap();
    let second = timeout(DEFAULT_TIMEOUT, events.recv()).await.unwrap();
    assert_eq!(first, Some(ClientEvent::State(ConnectionState::Connecting)));
    assert_eq!(second, Some(ClientEvent::State(ConnectionState::Connected)));

    client.close().await;
}

#[tokio::test]
async fn test_reconnects_after_server_drop() {
    let mut server = WebSocketServer::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", server.local_addr().unwrap());
    let (client, _events) = CortexClient::spawn(ClientConfig::new(url).retry_interval(RETRY));

    let (first, _rx, _) = timeout(DEFAULT_TIMEOUT, server.accept())
        .await
        .unwrap()
        .unwrap();
    assert!(client.wait_connected(DEFAULT_TIMEOUT).await);

    first.close().await.unwrap();

    // A second connection arrives after the retry interval
    let (_second, _rx2, _) = timeout(DEFAULT_TIMEOUT, server.accept())
        .await
        .unwrap()
        .unwrap();
    assert!(client.wait_connected(DEFAULT_TIMEOUT).await);

    client.close().await;
}

#[tokio::test]
async fn test_waits_for_late_server() {
    let port = find_available_port().await;
    let (client, _events) = CortexClient::spawn(
        ClientConfig::new(format!("ws://127.0.0.1:{}", port)).retry_interval(RETRY),
    );

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_ne!(client.state(), ConnectionState::Connected);
    assert!(matches!(
        client.send("/daemon/x", vec![]).await,
        Err(ClientError::NotConnected)
    ));

    let mut server = WebSocketServer::bind(&format!("127.0.0.1:{}", port))
        .await
        .unwrap();
    let _conn = timeout(DEFAULT_TIMEOUT, server.accept())
        .await
        .unwrap()
        .unwrap();
    assert!(client.wait_connected(DEFAULT_TIMEOUT).await);

    client.close().await;
}

#[tokio::test]
async fn test_close_disconnects_from_bridge() {
    let bridge = TestBridge::start().await;
    let (client, _events) = CortexClient::spawn(ClientConfig::new(bridge.ws_url()));
    assert!(client.wait_connected(DEFAULT_TIMEOUT).await);
    assert!(bridge.wait_for_clients(1).await);

    client.close().await;

    assert!(bridge.wait_for_clients(0).await);
    assert!(matches!(
        client.send("/daemon/ping", vec![]).await,
        Err(ClientError::Closed)
    ));
}
