//! `TOPICS`

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::CommandError;

use crate::command::{Command, CommandKind, Payload};
use crate::hub::Hub;
use crate::session::Session;

/// List the topics the session follows, sorted.
pub struct TopicsCommand;

#[async_trait]
impl Command for TopicsCommand {
    fn minimal_args(&self) -> usize {
        1
    }

    fn maximal_args(&self) -> Option<usize> {
        Some(1)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Command
    }

    async fn execute(
        &self,
        _payload: &Payload,
        session: &Arc<Session>,
        hub: &Hub,
    ) -> Result<Vec<String>, CommandError> {
        Ok(hub.topics_of(session.id()))
    }
}
