//! PGN subscription registry
//!
//! Maps PGN to a set of handlers and dispatches each decoded message to a
//! snapshot of the handlers registered at the instant the frame arrived.
//! Dispatch holds no lock while handlers run, so a handler may freely
//! subscribe or unsubscribe during its own invocation without deadlocking
//! or affecting delivery of the frame in flight.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, warn};

use j1939_codec::J1939Message;

/// A PGN subscriber callback.
///
/// An `Err` (or a panic) is reported and swallowed at the dispatch
/// boundary; it never reaches the transport's delivery loop and never
/// starves the other handlers in the same dispatch.
pub type PgnHandler = dyn Fn(&J1939Message) -> anyhow::Result<()> + Send + Sync;

/// Thread-safe PGN → handler-set registry.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    handlers: RwLock<HashMap<u32, Vec<HandlerEntry>>>,
    next_id: AtomicU64,
}

struct HandlerEntry {
    id: u64,
    handler: Arc<PgnHandler>,
}

/// Unsubscribe capability returned by `subscribe`.
///
/// Calling [`Subscription::unsubscribe`] removes exactly the handler
/// that produced the token and is idempotent. Dropping the token does
/// nothing; the handler stays registered until unsubscribed or the
/// registry is cleared.
pub struct Subscription {
    registry: Weak<RegistryInner>,
    pgn: u32,
    id: u64,
}

impl Subscription {
    /// Remove this subscription. Calling it twice is a no-op.
    pub fn unsubscribe(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut handlers = registry.handlers.write();
        if let Some(entries) = handlers.get_mut(&self.pgn) {
            entries.retain(|entry| entry.id != self.id);
            if entries.is_empty() {
                handlers.remove(&self.pgn);
            }
        }
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a PGN.
    pub fn subscribe<F>(&self, pgn: u32, handler: F) -> Subscription
    where
        F: Fn(&J1939Message) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .handlers
            .write()
            .entry(pgn)
            .or_default()
            .push(HandlerEntry {
                id,
                handler: Arc::new(handler),
            });
        debug!(pgn = format_args!("0x{:04X}", pgn), "subscribed");
        Subscription {
            registry: Arc::downgrade(&self.inner),
            pgn,
            id,
        }
    }

    /// Deliver `message` to every handler subscribed to `pgn` at the
    /// moment of the call.
    ///
    /// The handler set is snapshotted under the read lock and invoked
    /// with the lock released: a handler added mid-dispatch is not
    /// invoked for this frame, a handler removed mid-dispatch still runs
    /// if it was in the snapshot.
    pub fn dispatch(&self, pgn: u32, message: &J1939Message) {
        let snapshot: Vec<Arc<PgnHandler>> = {
            let handlers = self.inner.handlers.read();
            handlers
                .get(&pgn)
                .map(|entries| entries.iter().map(|e| Arc::clone(&e.handler)).collect())
                .unwrap_or_default()
        };

        for handler in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(message))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(pgn = format_args!("0x{:04X}", pgn), error = %e, "PGN handler failed");
                }
                Err(_) => {
                    warn!(pgn = format_args!("0x{:04X}", pgn), "PGN handler panicked");
                }
            }
        }
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        self.inner.handlers.write().clear();
    }

    /// Number of handlers registered for a PGN.
    pub fn handler_count(&self, pgn: u32) -> usize {
        self.inner.handlers.read().get(&pgn).map_or(0, Vec::len)
    }
}
