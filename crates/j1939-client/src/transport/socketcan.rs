//! Native SocketCAN transport (Linux only)
//!
//! Raw extended-frame I/O on a kernel CAN interface. The socket runs
//! non-blocking with a background reader on the blocking pool forwarding
//! inbound extended data frames into the broadcast channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use socketcan::{CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Id, Socket};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use j1939_codec::RawFrame;

use super::{CanTransport, TransportError};

pub struct SocketCanTransport {
    interface: String,
    socket: Arc<Mutex<Option<CanSocket>>>,
    connected: Arc<AtomicBool>,
    incoming_tx: broadcast::Sender<RawFrame>,
    listener_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SocketCanTransport {
    pub fn new(interface: &str) -> Self {
        let (incoming_tx, _) = broadcast::channel(1024);
        Self {
            interface: interface.to_string(),
            socket: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            incoming_tx,
            listener_handle: Mutex::new(None),
        }
    }

    fn start_listener(&self) {
        let socket = self.socket.clone();
        let incoming_tx = self.incoming_tx.clone();
        let connected = self.connected.clone();

        let handle = tokio::task::spawn_blocking(move || {
            while connected.load(Ordering::SeqCst) {
                let result = {
                    let guard = socket.lock();
                    guard.as_ref().map(|sock| sock.read_frame())
                };
                let Some(result) = result else {
                    break;
                };
                match result {
                    Ok(CanFrame::Data(frame)) => {
                        // Only 29-bit traffic is J1939; standard-id frames
                        // on the same bus are someone else's protocol
                        if let Id::Extended(id) = frame.id() {
                            let raw = RawFrame {
                                id: id.as_raw(),
                                data: frame.data().to_vec(),
                                timestamp: Some(Utc::now()),
                            };
                            let _ = incoming_tx.send(raw);
                        }
                    }
                    Ok(_) => {}
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                    Err(e) => {
                        error!(?e, "SocketCAN read error");
                        std::thread::sleep(Duration::from_millis(100));
                    }
                }
            }
            debug!("SocketCAN listener stopped");
        });

        *self.listener_handle.lock() = Some(handle);
    }
}

#[async_trait]
impl CanTransport for SocketCanTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        let interface = self.interface.clone();
        let sock = tokio::task::spawn_blocking(move || CanSocket::open(&interface))
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("task join error: {}", e)))?
            .map_err(|e| {
                TransportError::ConnectionFailed(format!(
                    "failed to open {}: {}",
                    self.interface, e
                ))
            })?;

        sock.set_nonblocking(true).map_err(|e| {
            TransportError::InvalidConfig(format!("failed to set non-blocking: {}", e))
        })?;

        *self.socket.lock() = Some(sock);
        self.connected.store(true, Ordering::SeqCst);
        self.start_listener();
        debug!(interface = %self.interface, "SocketCAN transport opened");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        // The reader loop sees the flag and exits; the socket closes on drop
        *self.socket.lock() = None;
        self.listener_handle.lock().take();
        Ok(())
    }

    async fn send(&self, frame: RawFrame) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }

        let ext_id = ExtendedId::new(frame.id).ok_or_else(|| {
            TransportError::InvalidConfig(format!("invalid extended CAN ID: 0x{:X}", frame.id))
        })?;
        let can_frame = CanFrame::new(Id::Extended(ext_id), &frame.data)
            .ok_or_else(|| TransportError::SendFailed("payload exceeds 8 bytes".to_string()))?;

        let socket = self.socket.clone();
        tokio::task::spawn_blocking(move || {
            let guard = socket.lock();
            match guard.as_ref() {
                Some(sock) => sock
                    .write_frame(&can_frame)
                    .map_err(|e| TransportError::SendFailed(e.to_string())),
                None => Err(TransportError::ConnectionClosed),
            }
        })
        .await
        .map_err(|e| TransportError::SendFailed(format!("task join error: {}", e)))??;

        Ok(())
    }

    fn frames(&self) -> broadcast::Receiver<RawFrame> {
        self.incoming_tx.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for SocketCanTransport {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}
