//! Concrete commands, one module per concern.

pub mod authenticate;
pub mod nick;
pub mod ping;
pub mod publish;
pub mod subscribe;
pub mod topics;

pub use authenticate::AuthenticateCommand;
pub use nick::NickCommand;
pub use ping::PingCommand;
pub use publish::{FanOut, PublishCommand};
pub use subscribe::{SubscribeCommand, UnsubscribeCommand};
pub use topics::TopicsCommand;

use herald_core::CommandError;

use crate::command::Payload;

/// `AUTH token`
pub const AUTH: &str = "AUTH";
/// `SUB topic`
pub const SUB: &str = "SUB";
/// `UNSUB topic`
pub const UNSUB: &str = "UNSUB";
/// `PUB topic part…`
pub const PUB: &str = "PUB";
/// `NICK name`
pub const NICK: &str = "NICK";
/// `TOPICS`
pub const TOPICS: &str = "TOPICS";
/// `PING`
pub const PING: &str = "PING";

/// Longest accepted topic name in bytes.
pub const MAX_TOPIC_LENGTH: usize = 256;

/// Longest accepted display name in bytes.
pub const MAX_NAME_LENGTH: usize = 64;

/// Read argument `index` as a non-empty string no longer than `max_len`.
pub(crate) fn require_text_arg<'a>(
    payload: &'a Payload,
    index: usize,
    name: &str,
    max_len: usize,
) -> Result<&'a str, CommandError> {
    let value = payload.arg(index)?;
    if value.is_empty() {
        return Err(CommandError::invalid_argument(format!(
            "'{name}' must not be empty"
        )));
    }
    if value.len() > max_len {
        return Err(CommandError::invalid_argument(format!(
            "'{name}' exceeds maximum length ({} > {max_len})",
            value.len()
        )));
    }
    Ok(value)
}
