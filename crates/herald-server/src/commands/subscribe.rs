//! `SUB topic` and `UNSUB topic`

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::CommandError;
use tracing::debug;

use crate::command::{Command, CommandKind, Payload};
use crate::commands::{MAX_TOPIC_LENGTH, require_text_arg};
use crate::hub::Hub;
use crate::session::Session;

/// Follow a topic. Re-subscribing is a no-op.
pub struct SubscribeCommand;

#[async_trait]
impl Command for SubscribeCommand {
    fn minimal_args(&self) -> usize {
        2
    }

    fn maximal_args(&self) -> Option<usize> {
        Some(2)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Command
    }

    async fn execute(
        &self,
        payload: &Payload,
        session: &Arc<Session>,
        hub: &Hub,
    ) -> Result<Vec<String>, CommandError> {
        let topic = require_text_arg(payload, 1, "topic", MAX_TOPIC_LENGTH)?;
        let added = hub.subscribe(topic, session.id())?;
        debug!(session_id = %session.id(), topic, added, "subscribe");
        let status = if added { "subscribed" } else { "already-subscribed" };
        Ok(vec![topic.to_owned(), status.to_owned()])
    }
}

/// Stop following a topic. Unsubscribing a non-member is a no-op.
pub struct UnsubscribeCommand;

#[async_trait]
impl Command for UnsubscribeCommand {
    fn minimal_args(&self) -> usize {
        2
    }

    fn maximal_args(&self) -> Option<usize> {
        Some(2)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Command
    }

    async fn execute(
        &self,
        payload: &Payload,
        session: &Arc<Session>,
        hub: &Hub,
    ) -> Result<Vec<String>, CommandError> {
        let topic = payload.arg(1)?;
        let removed = hub.unsubscribe(topic, session.id());
        debug!(session_id = %session.id(), topic, removed, "unsubscribe");
        let status = if removed { "unsubscribed" } else { "not-subscribed" };
        Ok(vec![topic.to_owned(), status.to_owned()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_helpers::{authenticated, payload};
    use herald_core::errors::INVALID_ARGUMENT;

    #[tokio::test]
    async fn subscribe_appends_session() {
        let hub = Hub::new();
        let (s1, _rx1) = authenticated(&hub);
        let (s2, _rx2) = authenticated(&hub);

        let d1 = SubscribeCommand
            .execute(&payload(&["SUB", "room1"]), &s1, &hub)
            .await
            .unwrap();
        assert_eq!(d1, vec!["room1", "subscribed"]);
        let _ = SubscribeCommand
            .execute(&payload(&["SUB", "room1"]), &s2, &hub)
            .await
            .unwrap();
        assert_eq!(hub.followers("room1"), vec![s1.id().clone(), s2.id().clone()]);
    }

    #[tokio::test]
    async fn subscribe_twice_is_idempotent() {
        let hub = Hub::new();
        let (s1, _rx) = authenticated(&hub);
        let p = payload(&["SUB", "room1"]);
        let _ = SubscribeCommand.execute(&p, &s1, &hub).await.unwrap();
        let again = SubscribeCommand.execute(&p, &s1, &hub).await.unwrap();
        assert_eq!(again, vec!["room1", "already-subscribed"]);
        assert_eq!(hub.followers("room1"), vec![s1.id().clone()]);
    }

    #[tokio::test]
    async fn subscribe_rejects_empty_topic() {
        let hub = Hub::new();
        let (s1, _rx) = authenticated(&hub);
        let err = SubscribeCommand
            .execute(&payload(&["SUB", ""]), &s1, &hub)
            .await
            .unwrap_err();
        assert_eq!(err.code(), INVALID_ARGUMENT);
        assert_eq!(hub.topic_count(), 0);
    }

    #[tokio::test]
    async fn subscribe_of_disconnected_session_fails() {
        let hub = Hub::new();
        let (s1, _rx) = authenticated(&hub);
        let _ = hub.disconnect(s1.id());
        let err = SubscribeCommand
            .execute(&payload(&["SUB", "room1"]), &s1, &hub)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "EXECUTION_ERROR");
        assert!(hub.is_consistent());
    }

    #[tokio::test]
    async fn unsubscribe_removes_session() {
        let hub = Hub::new();
        let (s1, _rx) = authenticated(&hub);
        let _ = hub.subscribe("room1", s1.id()).unwrap();
        let detail = UnsubscribeCommand
            .execute(&payload(&["UNSUB", "room1"]), &s1, &hub)
            .await
            .unwrap();
        assert_eq!(detail, vec!["room1", "unsubscribed"]);
        assert!(hub.followers("room1").is_empty());
        assert_eq!(hub.topic_count(), 0);
    }

    #[tokio::test]
    async fn unsubscribe_non_member_is_noop() {
        let hub = Hub::new();
        let (s1, _rx1) = authenticated(&hub);
        let (s2, _rx2) = authenticated(&hub);
        let _ = hub.subscribe("room1", s1.id()).unwrap();

        let detail = UnsubscribeCommand
            .execute(&payload(&["UNSUB", "room1"]), &s2, &hub)
            .await
            .unwrap();
        assert_eq!(detail, vec!["room1", "not-subscribed"]);
        assert_eq!(hub.followers("room1"), vec![s1.id().clone()]);
    }

    #[test]
    fn descriptors() {
        assert_eq!(SubscribeCommand.maximal_args(), Some(2));
        assert_eq!(UnsubscribeCommand.minimal_args(), 2);
        assert_eq!(SubscribeCommand.kind(), CommandKind::Command);
        assert_eq!(UnsubscribeCommand.kind(), CommandKind::Command);
    }
}
