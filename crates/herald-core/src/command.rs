//! Command entity definition
//!
//! A [`Command`] pairs one or more names with a handler, an optional
//! permission predicate and free-form metadata. Commands are immutable once
//! built; the registry shares them as `Arc<Command>`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::context::CommandContext;
use crate::message::IncomingMessage;

/// A name a command answers to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandName {
    /// Invoked as `<prefix><name>`
    Named(String),
    /// Invoked by a bare mention of the bot with nothing after it
    BareMention,
}

impl CommandName {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::BareMention => None,
        }
    }

    pub fn is_bare_mention(&self) -> bool {
        matches!(self, Self::BareMention)
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::BareMention => f.write_str("<bare mention>"),
        }
    }
}

impl From<&str> for CommandName {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for CommandName {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// Handler invoked when a command matches
///
/// Handlers own their arguments so they can be moved into spawned tasks.
/// Returning an error is reported through the client's `error` event; it
/// never stops the dispatcher.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(
        &self,
        message: Arc<IncomingMessage>,
        args: Vec<String>,
        ctx: CommandContext,
    ) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(Arc<IncomingMessage>, Vec<String>, CommandContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn call(
        &self,
        message: Arc<IncomingMessage>,
        args: Vec<String>,
        ctx: CommandContext,
    ) -> anyhow::Result<()> {
        (self)(message, args, ctx).await
    }
}

/// Permission predicate evaluated before a command runs
pub type PermissionCheck =
    Arc<dyn Fn(&IncomingMessage, &[String], &CommandContext) -> bool + Send + Sync>;

/// Descriptive data consumed by collaborators such as a help command
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommandMetadata {
    #[serde(default)]
    pub description: Option<String>,

    /// Argument synopsis, e.g. `<user> [reason]`
    #[serde(default)]
    pub usage: Option<String>,

    #[serde(default)]
    pub owner_only: bool,

    /// Hidden commands are left out of listings
    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub extra: HashMap<String, JsonValue>,
}

/// A registered, invocable command
#[derive(Clone)]
pub struct Command {
    names: Vec<CommandName>,
    handler: Arc<dyn CommandHandler>,
    permission: Option<PermissionCheck>,
    filename: Option<PathBuf>,
    metadata: CommandMetadata,
}

impl Command {
    /// Create a command with a canonical name
    pub fn new(name: impl Into<String>, handler: impl CommandHandler + 'static) -> Self {
        Self::from_parts(vec![CommandName::named(name)], Arc::new(handler))
    }

    /// Create the command answering a bare mention of the bot
    pub fn bare_mention(handler: impl CommandHandler + 'static) -> Self {
        Self::from_parts(vec![CommandName::BareMention], Arc::new(handler))
    }

    pub fn from_parts(names: Vec<CommandName>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            names,
            handler,
            permission: None,
            filename: None,
            metadata: CommandMetadata::default(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.names.push(CommandName::named(alias));
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names
            .extend(aliases.into_iter().map(|a| CommandName::named(a)));
        self
    }

    /// Also answer a bare mention of the bot
    pub fn with_bare_mention(mut self) -> Self {
        self.names.push(CommandName::BareMention);
        self
    }

    pub fn with_permission<F>(mut self, check: F) -> Self
    where
        F: Fn(&IncomingMessage, &[String], &CommandContext) -> bool + Send + Sync + 'static,
    {
        self.permission = Some(Arc::new(check));
        self
    }

    pub fn with_permission_check(mut self, check: PermissionCheck) -> Self {
        self.permission = Some(check);
        self
    }

    pub fn with_metadata(mut self, metadata: CommandMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub(crate) fn with_filename(mut self, path: impl Into<PathBuf>) -> Self {
        self.filename = Some(path.into());
        self
    }

    pub fn names(&self) -> &[CommandName] {
        &self.names
    }

    /// Canonical name: the first named entry, or the sentinel for a
    /// mention-only command
    pub fn name(&self) -> &CommandName {
        self.names
            .iter()
            .find(|n| !n.is_bare_mention())
            .or_else(|| self.names.first())
            .unwrap_or(&CommandName::BareMention)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        let canonical = self.name().clone();
        self.names
            .iter()
            .filter(move |n| **n != canonical)
            .filter_map(CommandName::as_str)
    }

    pub fn answers_to(&self, name: &CommandName) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    pub fn handler(&self) -> Arc<dyn CommandHandler> {
        self.handler.clone()
    }

    /// Evaluate the permission predicate; commands without one are open
    pub fn permits(&self, message: &IncomingMessage, args: &[String], ctx: &CommandContext) -> bool {
        self.permission
            .as_ref()
            .is_none_or(|check| check(message, args, ctx))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("names", &self.names)
            .field("filename", &self.filename)
            .field("has_permission_check", &self.permission.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(
        _msg: Arc<IncomingMessage>,
        _args: Vec<String>,
        _ctx: CommandContext,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_canonical_name_and_aliases() {
        let cmd = Command::new("ping", noop).with_aliases(["p", "pong"]);
        assert_eq!(cmd.name(), &CommandName::named("ping"));
        assert_eq!(cmd.aliases().collect::<Vec<_>>(), vec!["p", "pong"]);
        assert!(cmd.answers_to(&"pong".into()));
        assert!(!cmd.answers_to(&"Ping".into()));
    }

    #[test]
    fn test_bare_mention_only_command() {
        let cmd = Command::bare_mention(noop);
        assert_eq!(cmd.name(), &CommandName::BareMention);
        assert!(cmd.answers_to(&CommandName::BareMention));
        assert_eq!(cmd.aliases().count(), 0);
    }

    #[test]
    fn test_named_command_can_also_answer_mentions() {
        let cmd = Command::new("help", noop).with_bare_mention();
        assert_eq!(cmd.name(), &CommandName::named("help"));
        assert!(cmd.answers_to(&CommandName::BareMention));
    }

    #[test]
    fn test_programmatic_commands_have_no_filename() {
        let cmd = Command::new("ping", noop);
        assert!(cmd.filename().is_none());
        let tracked = cmd.with_filename("commands/ping.toml");
        assert_eq!(tracked.filename(), Some(Path::new("commands/ping.toml")));
    }
}
