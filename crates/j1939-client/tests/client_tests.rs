//! Integration tests for the J1939 client
//!
//! Clients meet on the process-shared in-memory bus; every test uses its
//! own interface name so the buses stay isolated. Tests that drive
//! end-to-end traffic are serialized to keep the shared registry calm.

use std::time::Duration;

use serial_test::serial;
use tokio::sync::mpsc;
use tokio::time::timeout;

use j1939_client::{ClientConfig, ClientError, J1939Client, TransportKind};
use j1939_codec::{address, pgn, SpnMap, SpnValue};

const RECV_TIMEOUT: Duration = Duration::from_secs(1);

fn config(interface: &str, source_address: u8) -> ClientConfig {
    ClientConfig::new(interface, source_address).with_transport(TransportKind::Virtual)
}

#[test]
fn test_construction_validates_source_address() {
    assert!(J1939Client::new(config("vcan0", address::ENGINE_1)).is_ok());
    assert!(J1939Client::new(config("vcan0", 0xFD)).is_ok());

    for bad in [0xFE, 0xFF] {
        let result = J1939Client::new(config("vcan0", bad));
        assert!(matches!(
            result,
            Err(ClientError::InvalidSourceAddress(addr)) if addr == bad
        ));
    }
}

#[tokio::test]
async fn test_send_and_request_require_connection() {
    let client = J1939Client::new(config("vcan-lifecycle-0", address::DIAG_TOOL_1)).unwrap();

    assert!(matches!(
        client.request_pgn(pgn::EEC1).await,
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(
        client.send_pgn(pgn::ET1, &SpnMap::new()).await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn test_double_connect_fails() {
    let client = J1939Client::new(config("vcan-lifecycle-1", address::DIAG_TOOL_1)).unwrap();

    client.connect().await.unwrap();
    assert!(client.is_connected());
    assert!(matches!(
        client.connect().await,
        Err(ClientError::AlreadyConnected)
    ));

    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_is_idempotent_and_client_reusable() {
    let client = J1939Client::new(config("vcan-lifecycle-2", address::DIAG_TOOL_1)).unwrap();

    // Disconnecting a never-connected client is a no-op
    client.disconnect().await.unwrap();
    assert!(!client.is_connected());

    client.connect().await.unwrap();
    client.disconnect().await.unwrap();
    client.disconnect().await.unwrap();
    assert!(!client.is_connected());

    // A clean disconnect allows a fresh connect
    client.connect().await.unwrap();
    assert!(client.is_connected());
    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_operations_fail_after_disconnect() {
    let client = J1939Client::new(config("vcan-lifecycle-3", address::DIAG_TOOL_1)).unwrap();

    client.connect().await.unwrap();
    client.disconnect().await.unwrap();

    assert!(matches!(
        client.request_pgn(pgn::EEC1).await,
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(
        client.send_pgn(pgn::ET1, &SpnMap::new()).await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
#[serial]
async fn test_pub_sub_between_two_clients() {
    let monitor = J1939Client::new(config("vcan-e2e-pubsub", address::DIAG_TOOL_2)).unwrap();
    let engine = J1939Client::new(config("vcan-e2e-pubsub", address::ENGINE_1)).unwrap();
    monitor.connect().await.unwrap();
    engine.connect().await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = monitor.on_pgn(pgn::EEC1, move |msg| {
        let speed = msg.spn("engineSpeed").and_then(|v| v.as_f64());
        let _ = tx.send((msg.source_address, msg.destination_address, speed));
        Ok(())
    });

    let mut spns = SpnMap::new();
    spns.insert("engineSpeed".to_string(), SpnValue::Float(1800.0));
    engine.send_pgn(pgn::EEC1, &spns).await.unwrap();

    let (source, destination, speed) = timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("no EEC1 delivered")
        .unwrap();
    assert_eq!(source, address::ENGINE_1);
    assert_eq!(destination, 0xFF);
    assert_eq!(speed, Some(1800.0));

    monitor.disconnect().await.unwrap();
    engine.disconnect().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_request_and_reply_round_trip() {
    let monitor = J1939Client::new(config("vcan-e2e-request", address::DIAG_TOOL_2)).unwrap();
    let engine = J1939Client::new(config("vcan-e2e-request", address::ENGINE_1)).unwrap();
    monitor.connect().await.unwrap();
    engine.connect().await.unwrap();

    // The engine side sees the request come in over the normal dispatch path
    let (req_tx, mut req_rx) = mpsc::unbounded_channel();
    let _engine_sub = engine.on_pgn(pgn::REQUEST, move |msg| {
        let requested = msg
            .spn("requestedPGN")
            .and_then(|v| v.as_text())
            .map(str::to_string);
        let _ = req_tx.send((msg.destination_address, requested));
        Ok(())
    });

    let (temp_tx, mut temp_rx) = mpsc::unbounded_channel();
    let _monitor_sub = monitor.on_pgn(pgn::ET1, move |msg| {
        let _ = temp_tx.send(msg.spn("coolantTemp").and_then(|v| v.as_i64()));
        Ok(())
    });

    monitor.request_pgn_from(pgn::ET1, address::ENGINE_1).await.unwrap();

    let (destination, requested) = timeout(RECV_TIMEOUT, req_rx.recv())
        .await
        .expect("no request delivered")
        .unwrap();
    assert_eq!(destination, address::ENGINE_1);
    assert_eq!(requested.as_deref(), Some("0xFEEE"));

    // Reply arrives asynchronously via the monitor's subscription
    let mut spns = SpnMap::new();
    spns.insert("coolantTemp".to_string(), SpnValue::Integer(92));
    engine.send_pgn(pgn::ET1, &spns).await.unwrap();

    let temp = timeout(RECV_TIMEOUT, temp_rx.recv())
        .await
        .expect("no reply delivered")
        .unwrap();
    assert_eq!(temp, Some(92));

    monitor.disconnect().await.unwrap();
    engine.disconnect().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_unsubscribed_handler_receives_nothing() {
    let monitor = J1939Client::new(config("vcan-e2e-unsub", address::DIAG_TOOL_2)).unwrap();
    let engine = J1939Client::new(config("vcan-e2e-unsub", address::ENGINE_1)).unwrap();
    monitor.connect().await.unwrap();
    engine.connect().await.unwrap();

    let (gone_tx, mut gone_rx) = mpsc::unbounded_channel();
    let sub = monitor.on_pgn(pgn::ET1, move |_| {
        let _ = gone_tx.send(());
        Ok(())
    });
    // A second handler stays subscribed as the delivery sentinel
    let (kept_tx, mut kept_rx) = mpsc::unbounded_channel();
    let _kept = monitor.on_pgn(pgn::ET1, move |_| {
        let _ = kept_tx.send(());
        Ok(())
    });

    sub.unsubscribe();
    sub.unsubscribe(); // twice is a no-op

    engine.send_pgn(pgn::ET1, &SpnMap::new()).await.unwrap();

    timeout(RECV_TIMEOUT, kept_rx.recv())
        .await
        .expect("sentinel handler missed the frame")
        .unwrap();
    assert!(gone_rx.try_recv().is_err());

    monitor.disconnect().await.unwrap();
    engine.disconnect().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_failing_handler_does_not_block_peer_handler() {
    let monitor = J1939Client::new(config("vcan-e2e-errors", address::DIAG_TOOL_2)).unwrap();
    let engine = J1939Client::new(config("vcan-e2e-errors", address::ENGINE_1)).unwrap();
    monitor.connect().await.unwrap();
    engine.connect().await.unwrap();

    let _bad = monitor.on_pgn(pgn::EEC1, |_| anyhow::bail!("boom"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _good = monitor.on_pgn(pgn::EEC1, move |msg| {
        let _ = tx.send(msg.spn("torque").and_then(|v| v.as_i64()));
        Ok(())
    });

    let mut spns = SpnMap::new();
    spns.insert("torque".to_string(), SpnValue::Integer(25));
    engine.send_pgn(pgn::EEC1, &spns).await.unwrap();

    let torque = timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("second handler never ran")
        .unwrap();
    assert_eq!(torque, Some(25));

    monitor.disconnect().await.unwrap();
    engine.disconnect().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_disconnect_clears_subscriptions() {
    let monitor = J1939Client::new(config("vcan-e2e-clear", address::DIAG_TOOL_2)).unwrap();
    let engine = J1939Client::new(config("vcan-e2e-clear", address::ENGINE_1)).unwrap();
    monitor.connect().await.unwrap();
    engine.connect().await.unwrap();

    let (stale_tx, mut stale_rx) = mpsc::unbounded_channel();
    let _stale = monitor.on_pgn(pgn::ET1, move |_| {
        let _ = stale_tx.send(());
        Ok(())
    });

    monitor.disconnect().await.unwrap();
    monitor.connect().await.unwrap();

    // Fresh subscription is the delivery sentinel after the reconnect
    let (fresh_tx, mut fresh_rx) = mpsc::unbounded_channel();
    let _fresh = monitor.on_pgn(pgn::ET1, move |_| {
        let _ = fresh_tx.send(());
        Ok(())
    });

    engine.send_pgn(pgn::ET1, &SpnMap::new()).await.unwrap();

    timeout(RECV_TIMEOUT, fresh_rx.recv())
        .await
        .expect("fresh handler missed the frame")
        .unwrap();
    assert!(stale_rx.try_recv().is_err());

    monitor.disconnect().await.unwrap();
    engine.disconnect().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_pdu1_frames_are_not_destination_filtered() {
    let monitor = J1939Client::new(config("vcan-e2e-permissive", address::DIAG_TOOL_2)).unwrap();
    let engine = J1939Client::new(config("vcan-e2e-permissive", address::ENGINE_1)).unwrap();
    monitor.connect().await.unwrap();
    engine.connect().await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = monitor.on_pgn(pgn::ENGINE_CONTROL_CMD, move |msg| {
        let _ = tx.send(msg.destination_address);
        Ok(())
    });

    // Addressed to the body controller, not to the monitor; every node
    // on the bus still decodes and dispatches it
    let mut cmd = SpnMap::new();
    cmd.insert("targetRpm".to_string(), SpnValue::Integer(1200));
    engine
        .send_pgn_to(pgn::ENGINE_CONTROL_CMD, &cmd, address::BODY)
        .await
        .unwrap();

    let destination = timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("command not delivered")
        .unwrap();
    assert_eq!(destination, address::BODY);

    monitor.disconnect().await.unwrap();
    engine.disconnect().await.unwrap();
}
