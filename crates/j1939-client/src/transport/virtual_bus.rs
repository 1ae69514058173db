//! In-memory CAN bus
//!
//! A process-local bus keyed by interface name, used for development and
//! tests. Each attached endpoint owns a bounded inbox; a send clones the
//! frame into every *other* endpoint's inbox and never blocks. A slow
//! endpoint loses its oldest frames (its listener sees a lag notice), it
//! can never stall the sender.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use j1939_codec::RawFrame;

use super::{CanTransport, TransportError};

const INBOX_CAPACITY: usize = 256;

/// Registry of in-memory buses: interface name to attached endpoints,
/// guarded by a single mutex.
///
/// Normally reached through [`VirtualBus::shared`] so that independently
/// constructed clients of the same interface name meet on one bus. Test
/// harnesses construct their own instance and inject it with
/// [`VirtualTransport::with_bus`] instead of relying on process state.
#[derive(Default)]
pub struct VirtualBus {
    endpoints: Mutex<HashMap<String, Vec<Endpoint>>>,
    next_id: AtomicU64,
}

struct Endpoint {
    id: u64,
    inbox: broadcast::Sender<RawFrame>,
}

impl VirtualBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The process-wide default bus.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<VirtualBus>> = OnceLock::new();
        SHARED.get_or_init(VirtualBus::new).clone()
    }

    /// Number of endpoints attached to an interface.
    pub fn endpoint_count(&self, interface: &str) -> usize {
        self.endpoints
            .lock()
            .get(interface)
            .map_or(0, Vec::len)
    }

    fn attach(&self, interface: &str, inbox: broadcast::Sender<RawFrame>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.endpoints
            .lock()
            .entry(interface.to_string())
            .or_default()
            .push(Endpoint { id, inbox });
        id
    }

    fn detach(&self, interface: &str, id: u64) {
        let mut endpoints = self.endpoints.lock();
        if let Some(bus) = endpoints.get_mut(interface) {
            bus.retain(|endpoint| endpoint.id != id);
            if bus.is_empty() {
                endpoints.remove(interface);
            }
        }
    }

    /// Deliver a frame to every endpoint on `interface` except the
    /// sender, stamping the receive time on each copy.
    fn broadcast(&self, interface: &str, sender_id: u64, frame: &RawFrame) {
        let endpoints = self.endpoints.lock();
        let Some(bus) = endpoints.get(interface) else {
            return;
        };
        for endpoint in bus.iter().filter(|endpoint| endpoint.id != sender_id) {
            let delivered = RawFrame {
                id: frame.id,
                data: frame.data.clone(),
                timestamp: Some(Utc::now()),
            };
            // Err means the endpoint has no live receiver yet
            let _ = endpoint.inbox.send(delivered);
        }
    }
}

/// One endpoint on an in-memory bus.
pub struct VirtualTransport {
    interface: String,
    bus: Arc<VirtualBus>,
    connected: AtomicBool,
    endpoint_id: Mutex<Option<u64>>,
    incoming_tx: broadcast::Sender<RawFrame>,
}

impl VirtualTransport {
    /// Endpoint on the process-wide shared bus.
    pub fn new(interface: &str) -> Self {
        Self::with_bus(interface, VirtualBus::shared())
    }

    /// Endpoint on an explicitly provided bus.
    pub fn with_bus(interface: &str, bus: Arc<VirtualBus>) -> Self {
        let (incoming_tx, _) = broadcast::channel(INBOX_CAPACITY);
        Self {
            interface: interface.to_string(),
            bus,
            connected: AtomicBool::new(false),
            endpoint_id: Mutex::new(None),
            incoming_tx,
        }
    }

    /// Inject a frame as if received from the bus (for testing).
    pub fn inject_frame(&self, frame: RawFrame) {
        let _ = self.incoming_tx.send(frame);
    }
}

#[async_trait]
impl CanTransport for VirtualTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        if self.connected.swap(true, Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed(
                "already attached".to_string(),
            ));
        }
        let id = self.bus.attach(&self.interface, self.incoming_tx.clone());
        *self.endpoint_id.lock() = Some(id);
        debug!(interface = %self.interface, endpoint = id, "attached to virtual bus");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(id) = self.endpoint_id.lock().take() {
            self.bus.detach(&self.interface, id);
            debug!(interface = %self.interface, endpoint = id, "detached from virtual bus");
        }
        Ok(())
    }

    async fn send(&self, frame: RawFrame) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }
        let Some(sender_id) = *self.endpoint_id.lock() else {
            return Err(TransportError::ConnectionClosed);
        };
        self.bus.broadcast(&self.interface, sender_id, &frame);
        Ok(())
    }

    fn frames(&self) -> broadcast::Receiver<RawFrame> {
        self.incoming_tx.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
