//! Opcode → command lookup.

use std::collections::HashMap;
use std::sync::Arc;

use herald_core::CommandError;

use crate::auth::Authenticator;
use crate::command::Command;
use crate::commands::{
    self, AuthenticateCommand, FanOut, NickCommand, PingCommand, PublishCommand,
    SubscribeCommand, TopicsCommand, UnsubscribeCommand,
};

/// Registry mapping opcodes to commands.
///
/// Built once at startup and shared read-only behind an `Arc`.
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// The built-in command set.
    pub fn standard(authenticator: Arc<dyn Authenticator>, fanout: FanOut) -> Self {
        let mut reg = Self::new();
        reg.register(commands::AUTH, AuthenticateCommand::new(authenticator));
        reg.register(commands::SUB, SubscribeCommand);
        reg.register(commands::UNSUB, UnsubscribeCommand);
        reg.register(commands::PUB, PublishCommand::new(fanout));
        reg.register(commands::NICK, NickCommand);
        reg.register(commands::TOPICS, TopicsCommand);
        reg.register(commands::PING, PingCommand);
        reg
    }

    /// Register a command for an opcode, replacing any previous one.
    pub fn register(&mut self, opcode: &str, command: impl Command + 'static) {
        let _ = self.commands.insert(opcode.to_owned(), Arc::new(command));
    }

    /// Look up the command for an opcode.
    pub fn get(&self, opcode: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(opcode)
    }

    /// Look up the command for an opcode, or fail with `UnknownCommand`.
    pub fn resolve(&self, opcode: &str) -> Result<&Arc<dyn Command>, CommandError> {
        self.get(opcode).ok_or_else(|| CommandError::UnknownCommand {
            opcode: opcode.to_owned(),
        })
    }

    /// Check whether an opcode is registered.
    pub fn has_command(&self, opcode: &str) -> bool {
        self.commands.contains_key(opcode)
    }

    /// List all registered opcodes (sorted).
    pub fn opcodes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
