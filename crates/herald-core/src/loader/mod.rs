//! Command loading from files
//!
//! Commands cannot be compiled at runtime, so a command file is a manifest:
//! it names the command, carries its metadata, and either binds to a
//! handler compiled into the binary (looked up in a [`HandlerTable`]) or
//! supplies a reply template. This is the extension point behind
//! [`CommandRegistry::load_directory`](crate::CommandRegistry::load_directory)
//! and hot-reload; other [`CommandLoader`] implementations can plug in here.

pub mod manifest;
pub mod template;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::command::{Command, CommandHandler};
use crate::Result;

pub use manifest::{CommandManifest, ManifestAction, ManifestFile, ManifestLoader};
pub use template::ReplyTemplate;

/// Maps a file to a command
#[async_trait]
pub trait CommandLoader: Send + Sync {
    /// Whether this loader handles `path` at all; other files are skipped
    fn accepts(&self, _path: &Path) -> bool {
        true
    }

    /// Load the command defined in `path`
    ///
    /// Errors should be [`Error::InvalidCommandModule`](crate::Error::InvalidCommandModule)
    /// naming the file.
    async fn load(&self, path: &Path) -> Result<Command>;
}

/// Named handlers that command manifests can bind to
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`, replacing any previous one
    pub fn insert(&mut self, name: impl Into<String>, handler: impl CommandHandler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn insert_arc(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }
}
