//! j1939-client - publish/subscribe client for J1939 networks
//!
//! Connects to a CAN interface (in-memory virtual bus, or SocketCAN on
//! Linux with the `socketcan` feature), decodes inbound frames into named
//! signals, and dispatches them to PGN subscribers. Outbound, it encodes
//! signal maps into frames and offers the J1939 Request group for asking
//! other nodes to transmit.
//!
//! # Example
//!
//! ```rust,no_run
//! use j1939_client::{ClientConfig, J1939Client};
//! use j1939_codec::{address, pgn, SpnMap, SpnValue};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = J1939Client::new(ClientConfig::new("vcan0", address::DIAG_TOOL_2))?;
//!     client.connect().await?;
//!
//!     // Watch engine speed
//!     let _sub = client.on_pgn(pgn::EEC1, |msg| {
//!         if let Some(speed) = msg.spn("engineSpeed").and_then(|v| v.as_f64()) {
//!             println!("{:.1} RPM", speed);
//!         }
//!         Ok(())
//!     });
//!
//!     // Ask the engine for temperature data
//!     client.request_pgn(pgn::ET1).await?;
//!
//!     // Command a target speed
//!     let mut cmd = SpnMap::new();
//!     cmd.insert("targetRpm".to_string(), SpnValue::Integer(1200));
//!     cmd.insert("enable".to_string(), SpnValue::Bool(true));
//!     client.send_pgn(pgn::ENGINE_CONTROL_CMD, &cmd).await?;
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

mod client;
pub mod config;
pub mod error;
pub mod registry;
pub mod transport;

pub use client::J1939Client;
pub use config::{ClientConfig, TransportKind};
pub use error::{ClientError, Result};
pub use registry::{PgnHandler, Subscription, SubscriptionRegistry};
pub use transport::{CanTransport, TransportError};

// Re-export the codec types that appear in the public API
pub use j1939_codec::{address, pgn, J1939Message, RawFrame, SpnMap, SpnValue};
