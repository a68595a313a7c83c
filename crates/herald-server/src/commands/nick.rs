//! `NICK name`

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::CommandError;
use tracing::debug;

use crate::command::{Command, CommandKind, Payload};
use crate::commands::{MAX_NAME_LENGTH, require_text_arg};
use crate::hub::Hub;
use crate::session::{NAME_ATTRIBUTE, Session};

/// Set the session's display name.
pub struct NickCommand;

#[async_trait]
impl Command for NickCommand {
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
        _hub: &Hub,
    ) -> Result<Vec<String>, CommandError> {
        let name = require_text_arg(payload, 1, "name", MAX_NAME_LENGTH)?;
        let previous = session.set_attribute(NAME_ATTRIBUTE, name);
        debug!(session_id = %session.id(), name, ?previous, "nick");
        Ok(vec![name.to_owned()])
    }
}
