//! The set of live sessions, owned by identity.

use std::collections::HashMap;
use std::sync::Arc;

use herald_core::SessionId;

use crate::session::Session;

/// Connected sessions indexed by ID.
///
/// This is the only owner of `Arc<Session>` handles inside the core; every
/// other structure refers to sessions by [`SessionId`].
#[derive(Default)]
pub struct ConnectedSessions {
    sessions: HashMap<SessionId, Arc<Session>>,
}

impl ConnectedSessions {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session, replacing (and returning) any session with the same ID.
    pub fn insert(&mut self, session: Arc<Session>) -> Option<Arc<Session>> {
        self.sessions.insert(session.id().clone(), session)
    }

    /// Remove a session by ID.
    pub fn remove(&mut self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.remove(id)
    }

    /// Look up a session.
    pub fn get(&self, id: &SessionId) -> Option<&Arc<Session>> {
        self.sessions.get(id)
    }

    /// Whether the session is connected.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of connected sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// IDs of all connected sessions (sorted).
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }
}
