//! End-to-end gateway tests over real TCP sockets.
//!
//! Each test binds an ephemeral port, drives the wire protocol exactly as
//! a game-server process would, and observes gateway behavior through the
//! socket and the shared registry.

use gateway_server::auth::StaticTokenValidator;
use gateway_server::bus::{InProcessBus, MessageBus, ADMIN_COMMAND_TOPIC};
use gateway_server::{CommandRelay, Gateway, GatewayConfig, SessionRegistry};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

struct TestGateway {
    gateway: Arc<Gateway>,
    bus: Arc<InProcessBus>,
    addr: SocketAddr,
}

async fn start_gateway(tokens: &[&str]) -> TestGateway {
    let registry = Arc::new(SessionRegistry::new());
    let validator = Arc::new(StaticTokenValidator::new(
        tokens.iter().map(|t| t.to_string()),
    ));
    let bus = Arc::new(InProcessBus::new());
    let config = GatewayConfig {
        idle_timeout: Duration::from_secs(10),
        max_frame_bytes: 64 * 1024,
        ..Default::default()
    };
    let gateway = Arc::new(Gateway::new(config, registry, validator, bus.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accept_gateway = gateway.clone();
    tokio::spawn(async move { accept_gateway.serve_listener(listener).await });

    TestGateway { gateway, bus, addr }
}

async fn send_frame(stream: &mut TcpStream, body: &Value) {
    let bytes = serde_json::to_vec(body).unwrap();
    stream
        .write_all(&(bytes.len() as u32).to_be_bytes())
        .await
        .unwrap();
    stream.write_all(&bytes).await.unwrap();
}

async fn read_frame(stream: &mut TcpStream) -> Value {
    let mut header = [0u8; 4];
    timeout(Duration::from_secs(5), stream.read_exact(&mut header))
        .await
        .expect("timed out waiting for a frame")
        .unwrap();
    let len = u32::from_be_bytes(header) as usize;
    let mut body = vec![0u8; len];
    timeout(Duration::from_secs(5), stream.read_exact(&mut body))
        .await
        .expect("timed out reading frame body")
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn read_eof(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    let read = timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("timed out waiting for connection close")
        .unwrap();
    assert_eq!(read, 0, "expected the gateway to close the connection");
}

fn login_frame(token: &str) -> Value {
    json!({
        "type": 210,
        "token": token,
        "serverName": "Lobby",
        "serverVersion": "1.20",
        "serverIp": "10.0.0.1",
    })
}

async fn login(stream: &mut TcpStream, token: &str) -> Value {
    send_frame(stream, &login_frame(token)).await;
    read_frame(stream).await
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test]
async fn successful_login_registers_session_and_responds() {
    let harness = start_gateway(&["abc"]).await;
    let mut stream = TcpStream::connect(harness.addr).await.unwrap();

    let response = login(&mut stream, "abc").await;
    assert_eq!(response["type"], 211);
    assert_eq!(response["code"], 100);
    assert_eq!(response["msg"], "Login Success");
    assert!(response["sessionId"].is_string());

    let registry = harness.gateway.registry();
    let session = registry.get_by_token("abc").expect("session registered");
    assert_eq!(
        response["sessionId"].as_str().unwrap(),
        session.session_id().to_string()
    );
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn invalid_token_is_rejected_and_connection_closed() {
    let harness = start_gateway(&["abc"]).await;
    let mut stream = TcpStream::connect(harness.addr).await.unwrap();

    let response = login(&mut stream, "wrong").await;
    assert_eq!(response["type"], 211);
    assert_eq!(response["code"], 101);
    assert!(response.get("sessionId").is_none());

    read_eof(&mut stream).await;
    assert_eq!(harness.gateway.registry().len(), 0);
}

#[tokio::test]
async fn packets_before_login_are_ignored_not_fatal() {
    let harness = start_gateway(&["abc"]).await;
    let mut stream = TcpStream::connect(harness.addr).await.unwrap();

    // a heartbeat and an unknown type before authentication: both dropped
    send_frame(&mut stream, &json!({ "type": 212 })).await;
    send_frame(&mut stream, &json!({ "type": 999, "noise": true })).await;

    let response = login(&mut stream, "abc").await;
    assert_eq!(response["code"], 100);
}

#[tokio::test]
async fn kick_command_is_relayed_to_the_target_socket() {
    let harness = start_gateway(&["abc"]).await;

    let relay = CommandRelay::new(
        harness.gateway.registry(),
        harness.bus.clone(),
        64 * 1024,
    );
    let shutdown = harness.gateway.subscribe_shutdown();
    tokio::spawn(async move { relay.run(shutdown).await });
    tokio::task::yield_now().await;

    let mut stream = TcpStream::connect(harness.addr).await.unwrap();
    let response = login(&mut stream, "abc").await;
    assert_eq!(response["code"], 100);

    harness
        .bus
        .publish(
            ADMIN_COMMAND_TOPIC,
            serde_json::to_vec(&json!({
                "token": "abc",
                "commandType": "KICK",
                "targetPlayer": "Steve",
                "reason": "AFK",
                "commandId": "c1",
            }))
            .unwrap(),
        )
        .await
        .unwrap();

    let command = read_frame(&mut stream).await;
    assert_eq!(command["type"], 214);
    assert_eq!(command["commandType"], "KICK");
    assert_eq!(command["targetPlayer"], "Steve");
    assert_eq!(command["reason"], "AFK");
    assert_eq!(command["commandId"], "c1");
    assert!(command.get("token").is_none());
}

#[tokio::test]
async fn disconnect_releases_the_registry_entry() {
    let harness = start_gateway(&["abc"]).await;
    let mut stream = TcpStream::connect(harness.addr).await.unwrap();
    login(&mut stream, "abc").await;

    let registry = harness.gateway.registry();
    assert_eq!(registry.len(), 1);

    drop(stream);
    wait_until(|| registry.len() == 0).await;
    assert!(registry.get_by_token("abc").is_none());
}

#[tokio::test]
async fn duplicate_login_disconnects_the_previous_session() {
    let harness = start_gateway(&["abc"]).await;

    let mut first = TcpStream::connect(harness.addr).await.unwrap();
    let first_response = login(&mut first, "abc").await;

    let mut second = TcpStream::connect(harness.addr).await.unwrap();
    let second_response = login(&mut second, "abc").await;
    assert_ne!(first_response["sessionId"], second_response["sessionId"]);

    // the displaced connection is force-closed by the gateway
    read_eof(&mut first).await;

    let registry = harness.gateway.registry();
    wait_until(|| registry.len() == 1).await;
    let session = registry.get_by_token("abc").unwrap();
    assert_eq!(
        session.session_id().to_string(),
        second_response["sessionId"].as_str().unwrap()
    );
}

#[tokio::test]
async fn oversize_frame_declaration_closes_the_connection() {
    let harness = start_gateway(&["abc"]).await;
    let mut stream = TcpStream::connect(harness.addr).await.unwrap();
    login(&mut stream, "abc").await;

    // declared length far above the configured 64 KB ceiling
    stream
        .write_all(&(10 * 1024 * 1024u32).to_be_bytes())
        .await
        .unwrap();

    read_eof(&mut stream).await;
    let registry = harness.gateway.registry();
    wait_until(|| registry.len() == 0).await;
}

#[tokio::test]
async fn malformed_message_does_not_close_the_connection() {
    let harness = start_gateway(&["abc"]).await;
    let mut stream = TcpStream::connect(harness.addr).await.unwrap();
    login(&mut stream, "abc").await;

    // well-framed garbage: dropped without killing the connection
    let garbage = b"{definitely not json";
    stream
        .write_all(&(garbage.len() as u32).to_be_bytes())
        .await
        .unwrap();
    stream.write_all(garbage).await.unwrap();

    // the session survives and heartbeats still land
    send_frame(&mut stream, &json!({ "type": 212 })).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.gateway.registry().len(), 1);
}
