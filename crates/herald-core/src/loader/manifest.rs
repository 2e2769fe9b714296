//! Command manifest files
//!
//! ```toml
//! [command]
//! name = "greet"
//! aliases = ["hi", "hello"]
//! description = "Say hello"
//! usage = "[name]"
//! reply = "Hello, {args}!"
//! ```
//!
//! Instead of `reply`, a manifest can bind to a compiled handler with
//! `handler = "<name>"`. YAML files use the same layout under a top-level
//! `command:` key.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::command::{Command, CommandHandler, CommandMetadata, CommandName};
use crate::loader::{CommandLoader, HandlerTable, ReplyTemplate};
use crate::permission;
use crate::{Error, Result};

/// Top-level layout of a manifest file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub command: CommandManifest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandManifest {
    /// Canonical name; may be omitted for a mention-only command
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub aliases: Vec<String>,

    /// Also answer a bare mention of the bot
    #[serde(default)]
    pub bare_mention: bool,

    #[serde(flatten)]
    pub metadata: CommandMetadata,

    #[serde(flatten)]
    pub action: ManifestAction,
}

/// What running the command does
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestAction {
    /// Run a handler registered in the loader's [`HandlerTable`]
    Handler { handler: String },
    /// Reply with a template (see [`ReplyTemplate`])
    Reply { reply: String },
}

impl CommandManifest {
    fn names(&self) -> Vec<CommandName> {
        let mut names: Vec<CommandName> = self
            .name
            .iter()
            .chain(self.aliases.iter())
            .map(|n| CommandName::named(n.as_str()))
            .collect();
        if self.bare_mention {
            names.push(CommandName::BareMention);
        }
        names
    }
}

/// Loads TOML and YAML command manifests
pub struct ManifestLoader {
    handlers: HandlerTable,
}

impl ManifestLoader {
    pub fn new(handlers: HandlerTable) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    /// Parse a manifest without touching the filesystem
    pub fn parse(&self, path: &Path, content: &str) -> Result<ManifestFile> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yaml" | "yml" => serde_yaml::from_str(content)
                .map_err(|e| Error::invalid_module(path, format!("invalid YAML: {}", e))),
            "toml" => toml::from_str(content)
                .map_err(|e| Error::invalid_module(path, format!("invalid TOML: {}", e))),
            _ => Err(Error::invalid_module(
                path,
                format!("unsupported command file format: {}", extension),
            )),
        }
    }

    /// Turn a parsed manifest into a command
    pub fn build(&self, path: &Path, manifest: CommandManifest) -> Result<Command> {
        let names = manifest.names();
        if names.is_empty() {
            return Err(Error::invalid_module(
                path,
                "manifest needs a `name` or `bare_mention = true`",
            ));
        }

        let handler: Arc<dyn CommandHandler> = match &manifest.action {
            ManifestAction::Handler { handler } => self.handlers.get(handler).ok_or_else(|| {
                Error::invalid_module(path, format!("unknown handler '{}'", handler))
            })?,
            ManifestAction::Reply { reply } => Arc::new(ReplyTemplate::new(reply.as_str())),
        };

        let mut command = Command::from_parts(names, handler);
        if manifest.metadata.owner_only {
            command = command.with_permission_check(permission::owner_only());
        }
        Ok(command.with_metadata(manifest.metadata))
    }
}

#[async_trait]
impl CommandLoader for ManifestLoader {
    fn accepts(&self, path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("toml" | "yaml" | "yml")
        )
    }

    async fn load(&self, path: &Path) -> Result<Command> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| Error::invalid_module(path, format!("failed to read file: {}", e)))?;

        let file = self.parse(path, &content)?;
        self.build(path, file.command)
    }
}
