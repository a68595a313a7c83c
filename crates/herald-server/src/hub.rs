//! Shared registries and their locking discipline.
//!
//! The [`Hub`] couples [`ConnectedSessions`] and [`FollowerTable`] behind two
//! `parking_lot` read-write locks. Every method that needs both acquires the
//! followers lock first, then the sessions lock, and no guard is held across
//! an `.await`.

use std::sync::Arc;

use herald_core::{CommandError, SessionId};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::followers::FollowerTable;
use crate::session::Session;
use crate::sessions::ConnectedSessions;

/// State shared by every command execution.
#[derive(Default)]
pub struct Hub {
    followers: RwLock<FollowerTable>,
    sessions: RwLock<ConnectedSessions>,
}

impl Hub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly accepted session.
    pub fn connect(&self, session: Arc<Session>) {
        let id = session.id().clone();
        let replaced = self.sessions.write().insert(session);
        if replaced.is_some() {
            debug!(session_id = %id, "replaced session with duplicate id");
        }
        info!(session_id = %id, "session connected");
    }

    /// Purge a session from every topic and from the connected set.
    ///
    /// Both locks are held for writing, so a concurrent publish sees the
    /// session either fully present or fully gone.
    pub fn disconnect(&self, id: &SessionId) -> Option<Arc<Session>> {
        let mut followers = self.followers.write();
        let mut sessions = self.sessions.write();
        let topics_left = followers.remove_session(id);
        let removed = sessions.remove(id);
        drop(sessions);
        drop(followers);

        if removed.is_some() {
            info!(session_id = %id, topics_left, "session disconnected");
        }
        removed
    }

    /// Add a connected session to a topic.
    ///
    /// Returns `Ok(false)` if it was already following. Sessions that are not
    /// connected are refused so the table never references a dead session.
    pub fn subscribe(&self, topic: &str, id: &SessionId) -> Result<bool, CommandError> {
        let mut followers = self.followers.write();
        if !self.sessions.read().contains(id) {
            return Err(CommandError::execution(format!(
                "session '{id}' is not connected"
            )));
        }
        Ok(followers.subscribe(topic, id))
    }

    /// Remove a session from a topic. Returns `false` if it was not following.
    pub fn unsubscribe(&self, topic: &str, id: &SessionId) -> bool {
        self.followers.write().unsubscribe(topic, id)
    }

    /// Snapshot the sessions a publish on `topic` should reach, in
    /// subscription order, optionally leaving out `exclude`.
    pub fn recipients(&self, topic: &str, exclude: Option<&SessionId>) -> Vec<Arc<Session>> {
        let followers = self.followers.read();
        let sessions = self.sessions.read();
        followers
            .followers(topic)
            .iter()
            .filter(|id| Some(*id) != exclude)
            .filter_map(|id| sessions.get(id).cloned())
            .collect()
    }

    /// Follower IDs of a topic in subscription order.
    pub fn followers(&self, topic: &str) -> Vec<SessionId> {
        self.followers.read().followers(topic).to_vec()
    }

    /// Topics a session follows (sorted).
    pub fn topics_of(&self, id: &SessionId) -> Vec<String> {
        self.followers.read().topics_of(id)
    }

    /// Look up a connected session.
    pub fn session(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Whether a session is connected.
    pub fn is_connected(&self, id: &SessionId) -> bool {
        self.sessions.read().contains(id)
    }

    /// Number of connected sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Number of topics with at least one follower.
    pub fn topic_count(&self) -> usize {
        self.followers.read().topic_count()
    }

    /// Whether every follower in the table is a connected session.
    pub fn is_consistent(&self) -> bool {
        let followers = self.followers.read();
        let sessions = self.sessions.read();
        followers.all_followers().all(|id| sessions.contains(id))
    }
}
