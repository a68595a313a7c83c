//! Topic → follower list mapping.
//!
//! Each topic holds its followers in subscription order. A topic exists only
//! while it has at least one follower; the last unsubscribe (or disconnect)
//! removes the entry.

use std::collections::HashMap;

use herald_core::SessionId;

/// The pub/sub registry.
#[derive(Debug, Default)]
pub struct FollowerTable {
    topics: HashMap<String, Vec<SessionId>>,
}

impl FollowerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` to the topic's followers.
    ///
    /// Returns `false` (and changes nothing) if it already follows the topic.
    pub fn subscribe(&mut self, topic: &str, id: &SessionId) -> bool {
        let followers = self.topics.entry(topic.to_owned()).or_default();
        if followers.contains(id) {
            return false;
        }
        followers.push(id.clone());
        true
    }

    /// Remove `id` from the topic's followers.
    ///
    /// Returns `false` (and changes nothing) if it was not following.
    pub fn unsubscribe(&mut self, topic: &str, id: &SessionId) -> bool {
        let Some(followers) = self.topics.get_mut(topic) else {
            return false;
        };
        let Some(pos) = followers.iter().position(|f| f == id) else {
            return false;
        };
        let _ = followers.remove(pos);
        if followers.is_empty() {
            let _ = self.topics.remove(topic);
        }
        true
    }

    /// Remove `id` from every topic. Returns how many topics it left.
    pub fn remove_session(&mut self, id: &SessionId) -> usize {
        let mut left = 0;
        self.topics.retain(|_, followers| {
            let before = followers.len();
            followers.retain(|f| f != id);
            if followers.len() != before {
                left += 1;
            }
            !followers.is_empty()
        });
        left
    }

    /// Followers of a topic in subscription order (empty if unknown).
    pub fn followers(&self, topic: &str) -> &[SessionId] {
        self.topics.get(topic).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `id` follows `topic`.
    pub fn is_following(&self, topic: &str, id: &SessionId) -> bool {
        self.followers(topic).contains(id)
    }

    /// Topics `id` follows (sorted).
    pub fn topics_of(&self, id: &SessionId) -> Vec<String> {
        let mut topics: Vec<String> = self
            .topics
            .iter()
            .filter(|(_, followers)| followers.contains(id))
            .map(|(topic, _)| topic.clone())
            .collect();
        topics.sort();
        topics
    }

    /// Whether `id` appears in any topic.
    pub fn contains_session(&self, id: &SessionId) -> bool {
        self.topics.values().any(|followers| followers.contains(id))
    }

    /// Number of topics with at least one follower.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Iterate over every session ID in the table (with repeats across topics).
    pub fn all_followers(&self) -> impl Iterator<Item = &SessionId> {
        self.topics.values().flatten()
    }
}
