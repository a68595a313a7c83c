//! Per-connection session state.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use herald_core::SessionId;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::protocol::{Outbound, Response};

/// Attribute holding the display name set by `NICK`.
pub const NAME_ATTRIBUTE: &str = "name";
/// Attribute holding the principal resolved by `AUTH`.
pub const PRINCIPAL_ATTRIBUTE: &str = "principal";

/// Server-side state for one connected client.
pub struct Session {
    id: SessionId,
    authenticated: AtomicBool,
    attributes: Mutex<HashMap<String, String>>,
    /// Send channel to the client's write task.
    tx: mpsc::Sender<Outbound>,
    connected_at: Instant,
    dropped_messages: AtomicU64,
}

impl Session {
    /// Create a session that writes to `tx`.
    pub fn new(id: SessionId, tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            id,
            authenticated: AtomicBool::new(false),
            attributes: Mutex::new(HashMap::new()),
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Create a session with a fresh ID and a bounded outbound channel.
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(Self::new(SessionId::new(), tx)), rx)
    }

    /// Session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Whether an `AUTH` command has succeeded on this session.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Flip the authenticated flag.
    ///
    /// Returns `false` if the session was already authenticated; the flag
    /// only ever moves from `false` to `true`.
    pub fn mark_authenticated(&self) -> bool {
        self.authenticated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Read a session attribute.
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.attributes.lock().get(key).cloned()
    }

    /// Set a session attribute, returning the previous value.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.attributes.lock().insert(key.into(), value.into())
    }

    /// Push published data to this session.
    ///
    /// Never blocks. Returns `false` if the channel is full or closed, and
    /// increments the dropped message counter.
    pub fn deliver(&self, parts: Vec<String>) -> bool {
        self.send(Outbound::Message { parts })
    }

    /// Report the outcome of one of this session's commands.
    pub fn respond(&self, response: Response) -> bool {
        self.send(Outbound::Response(response))
    }

    fn send(&self, item: Outbound) -> bool {
        if self.tx.try_send(item).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total messages dropped for this session.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Time since the session was created.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
