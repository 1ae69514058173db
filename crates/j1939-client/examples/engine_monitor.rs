//! Engine monitor walkthrough
//!
//! Spins up two clients on the in-memory bus: a simulated engine ECU that
//! answers data requests, and a diagnostic monitor that subscribes to
//! engine data, requests it, and sends a control command.
//!
//! Run with: cargo run --example engine_monitor

use std::time::Duration;

use tokio::sync::mpsc;

use j1939_client::{ClientConfig, J1939Client};
use j1939_codec::{address, pgn, SpnMap, SpnValue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let engine = J1939Client::new(ClientConfig::new("vcan0", address::ENGINE_1))?;
    let monitor = J1939Client::new(ClientConfig::new("vcan0", address::DIAG_TOOL_2))?;
    engine.connect().await?;
    monitor.connect().await?;
    println!("Connected to vcan0");

    // Engine side: answer PGN requests through a small worker, since
    // handlers are synchronous and sending is not
    let (req_tx, mut req_rx) = mpsc::unbounded_channel::<String>();
    let _req_sub = engine.on_pgn(pgn::REQUEST, move |msg| {
        if let Some(requested) = msg.spn("requestedPGN").and_then(|v| v.as_text()) {
            let _ = req_tx.send(requested.to_string());
        }
        Ok(())
    });
    let _cmd_sub = engine.on_pgn(pgn::ENGINE_CONTROL_CMD, |msg| {
        println!(
            "engine: control command, targetRpm={:?} enable={:?}",
            msg.spn("targetRpm"),
            msg.spn("enable")
        );
        Ok(())
    });

    // Monitor side: watch engine data
    let _eec1_sub = monitor.on_pgn(pgn::EEC1, |msg| {
        if let Some(speed) = msg.spn("engineSpeed").and_then(|v| v.as_f64()) {
            println!("monitor: engine speed {:.1} RPM", speed);
        }
        Ok(())
    });
    let _et1_sub = monitor.on_pgn(pgn::ET1, |msg| {
        if let Some(temp) = msg.spn("coolantTemp").and_then(|v| v.as_i64()) {
            println!("monitor: coolant {}°C", temp);
        }
        Ok(())
    });

    // Request engine data and let the simulated ECU answer
    monitor.request_pgn(pgn::EEC1).await?;
    monitor.request_pgn(pgn::ET1).await?;

    let answer = async {
        while let Some(requested) = req_rx.recv().await {
            match requested.as_str() {
                "0xF004" => {
                    let mut spns = SpnMap::new();
                    spns.insert("engineSpeed".to_string(), SpnValue::Float(1800.0));
                    spns.insert("torque".to_string(), SpnValue::Integer(25));
                    engine.send_pgn(pgn::EEC1, &spns).await?;
                }
                "0xFEEE" => {
                    let mut spns = SpnMap::new();
                    spns.insert("coolantTemp".to_string(), SpnValue::Integer(92));
                    engine.send_pgn(pgn::ET1, &spns).await?;
                }
                other => println!("engine: no data for {}", other),
            }
        }
        anyhow::Ok(())
    };
    // Give the request/reply exchange a moment, then move on
    let _ = tokio::time::timeout(Duration::from_millis(500), answer).await;

    // Command a target speed
    println!("monitor: commanding 1200 RPM");
    let mut cmd = SpnMap::new();
    cmd.insert("targetRpm".to_string(), SpnValue::Integer(1200));
    cmd.insert("enable".to_string(), SpnValue::Bool(true));
    monitor.send_pgn(pgn::ENGINE_CONTROL_CMD, &cmd).await?;

    tokio::time::sleep(Duration::from_millis(200)).await;

    monitor.disconnect().await?;
    engine.disconnect().await?;
    println!("Disconnected");
    Ok(())
}
