//! Ping/pong liveness for one connection.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Tracks when the peer was last heard from.
///
/// Any inbound frame counts as a sign of life, not only pongs.
#[derive(Debug)]
pub struct Liveness {
    last_seen: Mutex<Instant>,
}

impl Liveness {
    /// Start tracking from now.
    pub fn new() -> Self {
        Self {
            last_seen: Mutex::new(Instant::now()),
        }
    }

    /// Record activity from the peer.
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the peer was last heard from.
    pub fn silent_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Whether the peer has been silent longer than `timeout`.
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.silent_for() > timeout
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
