//! `PUB topic part…`: fan a message out to a topic's followers.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::CommandError;
use metrics::counter;
use tracing::{debug, warn};

use crate::command::{Command, CommandKind, Payload};
use crate::commands::{MAX_TOPIC_LENGTH, require_text_arg};
use crate::hub::Hub;
use crate::session::Session;

/// Whether a publisher that follows the topic receives its own message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FanOut {
    /// The publisher is skipped.
    #[default]
    ExcludeSender,
    /// The publisher is delivered to like any other follower.
    IncludeSender,
}

impl FanOut {
    /// Map the `publish.echoToSender` setting.
    pub fn from_echo(echo_to_sender: bool) -> Self {
        if echo_to_sender {
            Self::IncludeSender
        } else {
            Self::ExcludeSender
        }
    }
}

/// Deliver `payload[2..]` to every follower of `payload[1]`.
///
/// Recipients are snapshotted before delivery; a follower that unsubscribes
/// or disconnects mid-publish still gets this message, and one that
/// subscribes mid-publish does not. A full or closed recipient is skipped.
#[derive(Debug, Default)]
pub struct PublishCommand {
    fanout: FanOut,
}

impl PublishCommand {
    /// Publish with the given fan-out policy.
    pub fn new(fanout: FanOut) -> Self {
        Self { fanout }
    }

    /// The configured policy.
    pub fn fanout(&self) -> FanOut {
        self.fanout
    }
}

#[async_trait]
impl Command for PublishCommand {
    fn minimal_args(&self) -> usize {
        2
    }

    fn maximal_args(&self) -> Option<usize> {
        None
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
        let parts = payload.rest(2)?;

        let exclude = match self.fanout {
            FanOut::ExcludeSender => Some(session.id()),
            FanOut::IncludeSender => None,
        };
        let recipients = hub.recipients(topic, exclude);

        let mut delivered = 0usize;
        for recipient in &recipients {
            if recipient.deliver(parts.to_vec()) {
                delivered += 1;
            } else {
                counter!("messages_dropped_total").increment(1);
                warn!(
                    topic,
                    recipient = %recipient.id(),
                    dropped = recipient.drop_count(),
                    "recipient channel full or closed, message dropped"
                );
            }
        }

        debug!(
            session_id = %session.id(),
            topic,
            recipients = recipients.len(),
            delivered,
            "publish"
        );
        Ok(vec![topic.to_owned(), delivered.to_string()])
    }
}
