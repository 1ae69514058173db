//! J1939 client implementation
//!
//! Owns the connection lifecycle, the subscription registry, and the
//! inbound decode-and-dispatch path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use j1939_codec::{
    decode_frame, encode_frame_to, pgn, J1939Message, SpnMap, SpnValue, BROADCAST_ADDRESS,
    DEFAULT_PRIORITY,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::registry::{Subscription, SubscriptionRegistry};
use crate::transport::{create_transport, CanTransport};

/// Client for a J1939 network.
///
/// Starts disconnected; `connect` acquires a transport for the configured
/// interface and starts delivering decoded messages to PGN subscribers.
/// A client may be reused: connect, disconnect, connect again.
///
/// # Example
///
/// ```rust,no_run
/// use j1939_client::{ClientConfig, J1939Client};
/// use j1939_codec::{address, pgn};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = J1939Client::new(ClientConfig::new("vcan0", address::DIAG_TOOL_1))?;
///     client.connect().await?;
///
///     let _sub = client.on_pgn(pgn::EEC1, |msg| {
///         println!("engine speed: {:?}", msg.spn("engineSpeed"));
///         Ok(())
///     });
///
///     client.request_pgn(pgn::EEC1).await?;
///     client.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct J1939Client {
    config: ClientConfig,
    registry: SubscriptionRegistry,
    connected: AtomicBool,
    state: tokio::sync::Mutex<ConnectionState>,
}

#[derive(Default)]
struct ConnectionState {
    transport: Option<Arc<dyn CanTransport>>,
    listener: Option<JoinHandle<()>>,
}

impl J1939Client {
    /// Create a client.
    ///
    /// Fails with [`ClientError::InvalidSourceAddress`] when the source
    /// address is not a legal node identity (0x00-0xFD); no partial
    /// client is constructed.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: SubscriptionRegistry::new(),
            connected: AtomicBool::new(false),
            state: tokio::sync::Mutex::new(ConnectionState::default()),
        })
    }

    /// Connect to the network.
    ///
    /// Fails with [`ClientError::AlreadyConnected`] while a connection
    /// is live.
    pub async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.transport.is_some() {
            return Err(ClientError::AlreadyConnected);
        }

        info!(
            interface = %self.config.interface,
            source_address = format_args!("0x{:02X}", self.config.source_address),
            "connecting"
        );

        let transport = create_transport(&self.config);
        transport.connect().await?;

        state.listener = Some(self.spawn_listener(transport.as_ref()));
        state.transport = Some(transport);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Disconnect from the network. A no-op when already disconnected.
    ///
    /// Clears every subscription: after reconnecting, subscribers must
    /// register again.
    pub async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(transport) = state.transport.take() else {
            return Ok(());
        };
        self.connected.store(false, Ordering::SeqCst);

        if let Some(listener) = state.listener.take() {
            listener.abort();
        }
        if let Err(e) = transport.disconnect().await {
            warn!(error = %e, "transport close failed");
        }
        self.registry.clear();
        info!("disconnected");
        Ok(())
    }

    /// Subscribe to a PGN. May be called in any connection state, but
    /// subscriptions do not survive a disconnect.
    pub fn on_pgn<F>(&self, group: u32, handler: F) -> Subscription
    where
        F: Fn(&J1939Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry.subscribe(group, handler)
    }

    /// Request a PGN from the whole network.
    pub async fn request_pgn(&self, requested: u32) -> Result<()> {
        self.request_pgn_from(requested, BROADCAST_ADDRESS).await
    }

    /// Request a PGN from a specific node.
    ///
    /// Emits the Request group (0xEA00) with the 3-byte little-endian
    /// encoding of `requested`. The reply, if any node sends one,
    /// arrives through the normal dispatch path; this call never waits
    /// for it.
    pub async fn request_pgn_from(&self, requested: u32, destination: u8) -> Result<()> {
        let mut spns = SpnMap::new();
        spns.insert("requestedPGN".to_string(), SpnValue::from(requested));
        self.transmit(pgn::REQUEST, &spns, destination).await
    }

    /// Broadcast a PGN with the given signals.
    pub async fn send_pgn(&self, group: u32, spns: &SpnMap) -> Result<()> {
        self.transmit(group, spns, BROADCAST_ADDRESS).await
    }

    /// Send a PGN with the given signals to a specific node.
    pub async fn send_pgn_to(&self, group: u32, spns: &SpnMap, destination: u8) -> Result<()> {
        self.transmit(group, spns, destination).await
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn source_address(&self) -> u8 {
        self.config.source_address
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn transmit(&self, group: u32, spns: &SpnMap, destination: u8) -> Result<()> {
        let transport = {
            let state = self.state.lock().await;
            state.transport.clone().ok_or(ClientError::NotConnected)?
        };

        let frame = encode_frame_to(
            group,
            spns,
            self.config.source_address,
            DEFAULT_PRIORITY,
            destination,
        );
        debug!(
            pgn = format_args!("0x{:04X}", group),
            destination = format_args!("0x{:02X}", destination),
            "sending frame"
        );
        transport.send(frame).await?;
        Ok(())
    }

    fn spawn_listener(&self, transport: &dyn CanTransport) -> JoinHandle<()> {
        let mut frames = transport.frames();
        let registry = self.registry.clone();
        let verbose = self.config.debug;

        tokio::spawn(async move {
            loop {
                match frames.recv().await {
                    Ok(frame) => {
                        let message = decode_frame(&frame);
                        if verbose {
                            debug!(
                                pgn = %message.pgn_name,
                                source = format_args!("0x{:02X}", message.source_address),
                                "frame received"
                            );
                        }
                        // Every frame on the bus is dispatched by PGN; the
                        // PDU1 destination is decoded but not filtered on
                        registry.dispatch(message.pgn, &message);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "inbound frame listener lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("inbound frame channel closed");
                        break;
                    }
                }
            }
        })
    }
}
