//! `AUTH token`

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::CommandError;
use herald_core::errors::AUTH_FAILED;
use tracing::{info, instrument};

use crate::auth::Authenticator;
use crate::command::{Command, CommandKind, Payload};
use crate::hub::Hub;
use crate::session::{PRINCIPAL_ATTRIBUTE, Session};

/// Authenticate the session with a token.
///
/// Permitted in any state. A session that is already authenticated keeps its
/// principal and gets an execution error, so the flag flips at most once.
pub struct AuthenticateCommand {
    authenticator: Arc<dyn Authenticator>,
}

impl AuthenticateCommand {
    /// Verify tokens with `authenticator`.
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }
}

#[async_trait]
impl Command for AuthenticateCommand {
    fn minimal_args(&self) -> usize {
        2
    }

    fn maximal_args(&self) -> Option<usize> {
        Some(2)
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Authentication
    }

    #[instrument(skip_all, fields(opcode = "AUTH", session_id = %session.id()))]
    async fn execute(
        &self,
        payload: &Payload,
        session: &Arc<Session>,
        _hub: &Hub,
    ) -> Result<Vec<String>, CommandError> {
        let token = payload.arg(1)?;
        let Some(principal) = self.authenticator.verify(token).await else {
            info!("authentication rejected");
            return Err(CommandError::Execution {
                code: AUTH_FAILED,
                message: "Invalid credentials".into(),
            });
        };

        if !session.mark_authenticated() {
            return Err(CommandError::execution("session is already authenticated"));
        }
        let _ = session.set_attribute(PRINCIPAL_ATTRIBUTE, principal.clone());
        info!(principal, "session authenticated");
        Ok(vec![principal])
    }
}
