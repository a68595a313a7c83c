//! Outbound message types.
//!
//! A session's channel carries two kinds of traffic: the [`Response`] to each
//! of its own commands, and [`Outbound::Message`] parts fanned out by other
//! sessions' `PUB` commands.

use herald_core::errors::{CommandError, ErrorBody};
use serde::{Deserialize, Serialize};

/// Item queued on a session's outbound channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    /// Terminal outcome of a command issued by this session.
    Response(Response),
    /// Data published to a topic this session follows.
    Message {
        /// Published parts, in the publisher's order.
        parts: Vec<String>,
    },
}

/// Outcome of one command, reported to the session that issued it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Opcode of the command (empty if the payload had none).
    pub opcode: String,
    /// Whether the command executed successfully.
    pub success: bool,
    /// Command-specific detail (present when `success == true`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detail: Vec<String>,
    /// Error payload (present when `success == false`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    /// Build a success response.
    pub fn success(opcode: impl Into<String>, detail: Vec<String>) -> Self {
        Self {
            opcode: opcode.into(),
            success: true,
            detail,
            error: None,
        }
    }

    /// Build an error response from a command error.
    pub fn failure(opcode: impl Into<String>, err: &CommandError) -> Self {
        Self {
            opcode: opcode.into(),
            success: false,
            detail: Vec::new(),
            error: Some(err.to_error_body()),
        }
    }

    /// Build an error response with an explicit code, for failures that
    /// happen before a payload exists (e.g. an undecodable frame).
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            opcode: String::new(),
            success: false,
            detail: Vec::new(),
            error: Some(ErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    /// Build the response matching a dispatch outcome.
    pub fn from_outcome(opcode: &str, outcome: &Result<Vec<String>, CommandError>) -> Self {
        match outcome {
            Ok(detail) => Self::success(opcode, detail.clone()),
            Err(err) => Self::failure(opcode, err),
        }
    }

    /// Error code, if this is a failure.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}
