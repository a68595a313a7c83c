//! `PING`

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::CommandError;

use crate::command::{Command, CommandKind, Payload};
use crate::hub::Hub;
use crate::session::Session;

/// Application-level liveness check, allowed before authentication.
pub struct PingCommand;

#[async_trait]
impl Command for PingCommand {
    fn minimal_args(&self) -> usize {
        1
    }

    fn maximal_args(&self) -> Option<usize> {
        Some(1)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Authentication
    }

    async fn execute(
        &self,
        _payload: &Payload,
        _session: &Arc<Session>,
        _hub: &Hub,
    ) -> Result<Vec<String>, CommandError> {
        Ok(vec!["PONG".to_owned()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_helpers::{connected, payload};

    #[tokio::test]
    async fn answers_pong() {
        let hub = Hub::new();
        let (s1, _rx) = connected(&hub);
        assert!(PingCommand.can_execute(&s1));
        let detail = PingCommand
            .execute(&payload(&["PING"]), &s1, &hub)
            .await
            .unwrap();
        assert_eq!(detail, vec!["PONG"]);
    }
}
