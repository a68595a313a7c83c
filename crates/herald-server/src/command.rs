//! The command contract.
//!
//! A [`Command`] declares its arity and authorization class up front; the
//! dispatcher enforces both before calling [`Command::execute`].

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::CommandError;

use crate::hub::Hub;
use crate::session::Session;

/// Authorization class of a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Allowed on unauthenticated sessions.
    Authentication,
    /// Requires an authenticated session.
    Command,
}

impl CommandKind {
    /// Lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Command => "command",
        }
    }
}

/// Default authorization predicate.
pub fn is_permitted(kind: CommandKind, authenticated: bool) -> bool {
    kind == CommandKind::Authentication || authenticated
}

/// A command payload: element 0 is the opcode, the rest are arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    parts: Vec<String>,
}

impl Payload {
    /// Wrap decoded parts.
    pub fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }

    /// The opcode, or `None` for an empty payload.
    pub fn opcode(&self) -> Option<&str> {
        self.parts.first().map(String::as_str)
    }

    /// Number of elements, opcode included.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the payload has no elements.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Element `index`.
    ///
    /// Reading past the end is a [`CommandError::ContractViolation`]: the
    /// dispatcher has already checked arity, so this only happens when a
    /// command's declared bounds disagree with what it reads.
    pub fn arg(&self, index: usize) -> Result<&str, CommandError> {
        self.parts
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.violation(index))
    }

    /// Elements from `from` to the end (possibly empty).
    pub fn rest(&self, from: usize) -> Result<&[String], CommandError> {
        self.parts.get(from..).ok_or_else(|| self.violation(from))
    }

    /// All elements.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    fn violation(&self, index: usize) -> CommandError {
        CommandError::ContractViolation {
            opcode: self.opcode().unwrap_or_default().to_owned(),
            index,
            len: self.parts.len(),
        }
    }
}

impl From<Vec<String>> for Payload {
    fn from(parts: Vec<String>) -> Self {
        Self::new(parts)
    }
}

/// Trait implemented by every registered command.
#[async_trait]
pub trait Command: Send + Sync {
    /// Minimum payload length, opcode included.
    fn minimal_args(&self) -> usize;

    /// Maximum payload length, or `None` when unbounded.
    fn maximal_args(&self) -> Option<usize>;

    /// Authorization class.
    fn kind(&self) -> CommandKind;

    /// Whether `session` may run this command.
    fn can_execute(&self, session: &Session) -> bool {
        is_permitted(self.kind(), session.is_authenticated())
    }

    /// Reason reported when [`can_execute`](Self::can_execute) denies.
    fn denial_reason(&self, _session: &Session) -> String {
        "session is not authenticated".to_owned()
    }

    /// Perform the command's effect and return the response detail.
    async fn execute(
        &self,
        payload: &Payload,
        session: &Arc<Session>,
        hub: &Hub,
    ) -> Result<Vec<String>, CommandError>;
}
