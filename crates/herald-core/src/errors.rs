//! Command error codes and error type.
//!
//! Every rejected or failed command ends up as a [`CommandError`]. The
//! dispatcher converts it into an [`ErrorBody`] and sends it back to the
//! originating session; none of the variants is fatal to the server.

use serde::{Deserialize, Serialize};

// ── Error code constants ────────────────────────────────────────────

/// Opcode is not registered.
pub const UNKNOWN_COMMAND: &str = "UNKNOWN_COMMAND";
/// Payload length outside the command's accepted range.
pub const ARITY_ERROR: &str = "ARITY_ERROR";
/// Session is not allowed to run the command.
pub const AUTHORIZATION_ERROR: &str = "AUTHORIZATION_ERROR";
/// Generic failure inside a command's effect.
pub const EXECUTION_ERROR: &str = "EXECUTION_ERROR";
/// Credentials were rejected.
pub const AUTH_FAILED: &str = "AUTH_FAILED";
/// An argument value is malformed.
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
/// Transport frame could not be decoded into a payload.
pub const INVALID_PAYLOAD: &str = "INVALID_PAYLOAD";
/// Unexpected internal error.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Error raised while resolving, validating, or executing a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Opcode not present in the registry.
    #[error("Unknown command '{opcode}'")]
    UnknownCommand {
        /// The opcode that was looked up.
        opcode: String,
    },

    /// Payload length outside `[min, max]`.
    #[error("'{opcode}' expects {} arguments, got {actual}", describe_range(.min, .max))]
    Arity {
        /// Command opcode.
        opcode: String,
        /// Minimum accepted length, opcode included.
        min: usize,
        /// Maximum accepted length, `None` when unbounded.
        max: Option<usize>,
        /// Length of the payload received.
        actual: usize,
    },

    /// `can_execute` denied the session.
    #[error("'{opcode}' not permitted: {reason}")]
    Authorization {
        /// Command opcode.
        opcode: String,
        /// Why the session was denied.
        reason: String,
    },

    /// Failure inside a command's effect.
    #[error("{message}")]
    Execution {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// A command read past the end of its payload. Only reachable when a
    /// command's declared arity disagrees with what `execute` reads.
    #[error("'{opcode}' read argument {index} of a {len}-element payload")]
    ContractViolation {
        /// Command opcode.
        opcode: String,
        /// Index that was accessed.
        index: usize,
        /// Payload length.
        len: usize,
    },

    /// Unexpected internal failure (e.g. a panic caught during execution).
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl CommandError {
    /// Build an [`CommandError::Execution`] with the generic code.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            code: EXECUTION_ERROR,
            message: message.into(),
        }
    }

    /// Build an [`CommandError::Execution`] for a malformed argument.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::Execution {
            code: INVALID_ARGUMENT,
            message: message.into(),
        }
    }

    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCommand { .. } => UNKNOWN_COMMAND,
            Self::Arity { .. } => ARITY_ERROR,
            Self::Authorization { .. } => AUTHORIZATION_ERROR,
            Self::Execution { code, .. } => *code,
            Self::ContractViolation { .. } | Self::Internal { .. } => INTERNAL_ERROR,
        }
    }

    /// Whether this error indicates a bug rather than a caller mistake.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::ContractViolation { .. } | Self::Internal { .. })
    }

    /// Convert to the wire-format error body.
    ///
    /// Internal failures are reported as a bare "Internal error"; the detail
    /// only goes to the server log.
    pub fn to_error_body(&self) -> ErrorBody {
        let message = if self.is_internal() {
            "Internal error".to_owned()
        } else {
            self.to_string()
        };
        ErrorBody {
            code: self.code().to_owned(),
            message,
        }
    }
}

fn describe_range(min: &usize, max: &Option<usize>) -> String {
    match *max {
        Some(max) if max == *min => format!("exactly {min}"),
        Some(max) => format!("{min} to {max}"),
        None => format!("at least {min}"),
    }
}

/// Structured error body inside a response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. `ARITY_ERROR`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}
