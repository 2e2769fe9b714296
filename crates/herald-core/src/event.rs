//! Lifecycle events emitted by the client
//!
//! Events are fanned out over a `tokio::sync::broadcast` channel. Emitting
//! never blocks and never fails: with no subscribers the event is dropped,
//! and slow subscribers observe `RecvError::Lagged`.

use std::fmt;
use std::sync::Arc;

use crate::command::{Command, CommandName};
use crate::error::Error;
use crate::message::{ChannelId, IncomingMessage, MessageId};

/// Capacity of the broadcast channel backing [`Client::subscribe`](crate::Client::subscribe)
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Where an `error` or `warn` event originated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    pub command: Option<CommandName>,
    pub channel_id: Option<ChannelId>,
    pub message_id: Option<MessageId>,
    pub path: Option<std::path::PathBuf>,
}

impl EventContext {
    pub fn for_message(message: &IncomingMessage) -> Self {
        Self {
            channel_id: Some(message.channel_id),
            message_id: Some(message.id),
            ..Default::default()
        }
    }

    pub fn for_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn with_command(mut self, command: CommandName) -> Self {
        self.command = Some(command);
        self
    }
}

impl fmt::Display for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(command) = &self.command {
            parts.push(format!("command={}", command));
        }
        if let Some(channel) = self.channel_id {
            parts.push(format!("channel={}", channel));
        }
        if let Some(message) = self.message_id {
            parts.push(format!("message={}", message));
        }
        if let Some(path) = &self.path {
            parts.push(format!("path={}", path.display()));
        }
        f.write_str(&parts.join(" "))
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A command was added to the registry (including on reload)
    CommandLoaded(Arc<Command>),
    /// Own identity and application info have been resolved
    Ready,
    /// About to invoke a command
    PreCommand {
        command: Arc<Command>,
        message: Arc<IncomingMessage>,
    },
    /// A command invocation finished, successfully or not
    Command {
        command: Arc<Command>,
        message: Arc<IncomingMessage>,
    },
    Error {
        error: Arc<Error>,
        context: EventContext,
    },
    Warn {
        message: String,
        context: EventContext,
    },
}

impl ClientEvent {
    /// Event name as used by logging collaborators
    pub fn name(&self) -> &'static str {
        match self {
            Self::CommandLoaded(_) => "command-loaded",
            Self::Ready => "ready",
            Self::PreCommand { .. } => "pre-command",
            Self::Command { .. } => "command",
            Self::Error { .. } => "error",
            Self::Warn { .. } => "warn",
        }
    }

    pub(crate) fn error(error: Error, context: EventContext) -> Self {
        Self::Error {
            error: Arc::new(error),
            context,
        }
    }
}
