//! Command registry
//!
//! Ordered, in-memory collection of commands. Names (including aliases and
//! the bare-mention sentinel) are unique across the whole registry; lookup
//! returns the first command answering to a name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use tokio::fs;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::command::{Command, CommandName};
use crate::event::{ClientEvent, EventContext};
use crate::loader::CommandLoader;
use crate::{Error, Result};

/// Outcome of a directory scan or reload pass
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Canonical names of the commands that were (re)registered
    pub loaded: Vec<CommandName>,
    /// Files that failed, with the reason
    pub failed: Vec<(PathBuf, Arc<Error>)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct CommandRegistry {
    commands: RwLock<Vec<Arc<Command>>>,
    loader: Arc<dyn CommandLoader>,
    exclude: Regex,
    events: broadcast::Sender<ClientEvent>,
}

impl CommandRegistry {
    pub(crate) fn new(
        loader: Arc<dyn CommandLoader>,
        exclude: Regex,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            commands: RwLock::new(Vec::new()),
            loader,
            exclude,
            events,
        }
    }

    /// Register a command
    ///
    /// Fails with [`Error::DuplicateName`] if any of its names is already
    /// taken (or repeated within the command); the registry is unchanged.
    pub async fn register(&self, command: Command) -> Result<Arc<Command>> {
        let mut commands = self.commands.write().await;
        if let Some(name) = first_collision(&commands, &command, None) {
            return Err(Error::DuplicateName {
                name: name.to_string(),
            });
        }

        let command = Arc::new(command);
        commands.push(command.clone());
        drop(commands);

        debug!(command = %command.name(), "Registered command");
        let _ = self.events.send(ClientEvent::CommandLoaded(command.clone()));
        Ok(command)
    }

    /// Remove the command answering to `name`
    pub async fn unregister(&self, name: &CommandName) -> Option<Arc<Command>> {
        let mut commands = self.commands.write().await;
        let index = commands.iter().position(|c| c.answers_to(name))?;
        Some(commands.remove(index))
    }

    /// First command answering to `name`
    pub async fn lookup(&self, name: &CommandName) -> Option<Arc<Command>> {
        self.commands
            .read()
            .await
            .iter()
            .find(|c| c.answers_to(name))
            .cloned()
    }

    /// Lookup by a typed name token
    pub async fn find(&self, name: &str) -> Option<Arc<Command>> {
        self.lookup(&CommandName::named(name)).await
    }

    /// Snapshot of the registered commands in insertion order
    pub async fn commands(&self) -> Vec<Arc<Command>> {
        self.commands.read().await.clone()
    }

    pub async fn names(&self) -> Vec<CommandName> {
        self.commands
            .read()
            .await
            .iter()
            .flat_map(|c| c.names().iter().cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.commands.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.commands.read().await.is_empty()
    }

    /// Load every command file directly inside `dir`
    ///
    /// Files whose name matches the exclusion pattern, or that the loader
    /// does not accept, are skipped. A file that fails to load or register
    /// is recorded in the report (and emitted as an `error` event) without
    /// stopping the scan. Only an unreadable directory is an error.
    pub async fn load_directory(&self, dir: &Path) -> Result<LoadReport> {
        let mut entries = fs::read_dir(dir).await?;
        let mut paths = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let excluded = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_none_or(|n| self.exclude.is_match(n));
            if excluded || !self.loader.accepts(&path) {
                debug!(path = %path.display(), "Skipping file");
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        let mut report = LoadReport::default();
        for path in paths {
            let result = match self.loader.load(&path).await {
                Ok(command) => self.register(command.with_filename(&path)).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(command) => {
                    info!(
                        command = %command.name(),
                        path = %path.display(),
                        "Loaded command"
                    );
                    report.loaded.push(command.name().clone());
                }
                Err(e) => self.record_failure(&mut report, path, e),
            }
        }

        Ok(report)
    }

    /// Re-load every command that came from a file
    ///
    /// Each file is loaded first and then swapped in under a single write
    /// lock, so the registry never holds two commands for the same file. If
    /// a file fails to load or its new names collide, the previous command
    /// stays registered. The pass as a whole is not atomic: a message
    /// dispatched concurrently may see the old command for one file and the
    /// new one for another. Do not run two reload passes at once.
    pub async fn reload_tracked(&self) -> Result<LoadReport> {
        let tracked: Vec<PathBuf> = self
            .commands
            .read()
            .await
            .iter()
            .filter_map(|c| c.filename().map(Path::to_path_buf))
            .collect();

        let mut report = LoadReport::default();
        for path in tracked {
            let command = match self.loader.load(&path).await {
                Ok(command) => command.with_filename(&path),
                Err(e) => {
                    self.record_failure(&mut report, path, e);
                    continue;
                }
            };

            let mut commands = self.commands.write().await;
            if let Some(name) = first_collision(&commands, &command, Some(&path)) {
                drop(commands);
                let e = Error::DuplicateName {
                    name: name.to_string(),
                };
                self.record_failure(&mut report, path, e);
                continue;
            }

            commands.retain(|c| c.filename() != Some(path.as_path()));
            let command = Arc::new(command);
            commands.push(command.clone());
            drop(commands);

            info!(command = %command.name(), path = %path.display(), "Reloaded command");
            let _ = self.events.send(ClientEvent::CommandLoaded(command.clone()));
            report.loaded.push(command.name().clone());
        }

        Ok(report)
    }

    fn record_failure(&self, report: &mut LoadReport, path: PathBuf, error: Error) {
        warn!(path = %path.display(), error = %error, "Failed to load command file");
        let error = Arc::new(error);
        let _ = self.events.send(ClientEvent::Error {
            error: error.clone(),
            context: EventContext::for_path(&path),
        });
        report.failed.push((path, error));
    }
}

/// First name of `command` already taken in `commands` or repeated within
/// `command` itself. Commands loaded from `skip_file` are ignored.
fn first_collision<'a>(
    commands: &[Arc<Command>],
    command: &'a Command,
    skip_file: Option<&Path>,
) -> Option<&'a CommandName> {
    command.names().iter().enumerate().find_map(|(i, name)| {
        let repeated = command.names()[..i].contains(name);
        let taken = commands
            .iter()
            .filter(|c| skip_file.is_none() || c.filename() != skip_file)
            .any(|c| c.answers_to(name));
        (repeated || taken).then_some(name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CommandContext;
    use crate::loader::{HandlerTable, ManifestLoader};
    use crate::message::IncomingMessage;
    use std::io::Write;
    use tempfile::tempdir;

    async fn noop(
        _msg: Arc<IncomingMessage>,
        _args: Vec<String>,
        _ctx: CommandContext,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn registry() -> (CommandRegistry, broadcast::Receiver<ClientEvent>) {
        let (tx, rx) = broadcast::channel(64);
        let loader = Arc::new(ManifestLoader::new(HandlerTable::new()));
        let exclude = Regex::new("^[._]").unwrap();
        (CommandRegistry::new(loader, exclude, tx), rx)
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let (registry, mut events) = registry();
        registry
            .register(Command::new("ping", noop).with_alias("p"))
            .await
            .unwrap();

        assert!(registry.find("ping").await.is_some());
        assert!(registry.find("p").await.is_some());
        assert!(registry.find("PING").await.is_none());
        assert!(matches!(events.try_recv(), Ok(ClientEvent::CommandLoaded(_))));
    }

    #[tokio::test]
    async fn test_duplicate_alias_is_rejected_and_registry_unchanged() {
        let (registry, _events) = registry();
        registry
            .register(Command::new("ping", noop).with_alias("p"))
            .await
            .unwrap();

        let err = registry
            .register(Command::new("purge", noop).with_alias("p"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateName { ref name } if name == "p"));
        assert_eq!(registry.len().await, 1);
        assert!(registry.find("purge").await.is_none());
    }

    #[tokio::test]
    async fn test_repeated_name_within_one_command_is_rejected() {
        let (registry, _events) = registry();
        let err = registry
            .register(Command::new("ping", noop).with_alias("ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_only_one_bare_mention_command() {
        let (registry, _events) = registry();
        registry.register(Command::bare_mention(noop)).await.unwrap();
        let err = registry
            .register(Command::new("help", noop).with_bare_mention())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));
        assert!(registry.lookup(&CommandName::BareMention).await.is_some());
    }

    #[tokio::test]
    async fn test_names_are_unique_across_registry() {
        let (registry, _events) = registry();
        registry.register(Command::new("a", noop).with_aliases(["b", "c"])).await.unwrap();
        registry.register(Command::new("d", noop).with_alias("e")).await.unwrap();
        let _ = registry.register(Command::new("f", noop).with_alias("a")).await;

        let names = registry.names().await;
        for (i, name) in names.iter().enumerate() {
            assert!(!names[i + 1..].contains(name), "{} registered twice", name);
        }
    }

    #[tokio::test]
    async fn test_unregister() {
        let (registry, _events) = registry();
        registry.register(Command::new("ping", noop).with_alias("p")).await.unwrap();
        let removed = registry.unregister(&"p".into()).await.unwrap();
        assert_eq!(removed.name(), &CommandName::named("ping"));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_directory_tags_filenames_and_skips_excluded() {
        let dir = tempdir().unwrap();
        let ping = write_file(
            dir.path(),
            "ping.toml",
            "[command]\nname = \"ping\"\nreply = \"pong\"\n",
        );
        write_file(
            dir.path(),
            "_draft.toml",
            "[command]\nname = \"draft\"\nreply = \"x\"\n",
        );
        write_file(dir.path(), "notes.txt", "not a command");
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write_file(
            &dir.path().join("nested"),
            "deep.toml",
            "[command]\nname = \"deep\"\nreply = \"x\"\n",
        );

        let (registry, _events) = registry();
        let report = registry.load_directory(dir.path()).await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.loaded, vec![CommandName::named("ping")]);
        let cmd = registry.find("ping").await.unwrap();
        assert_eq!(cmd.filename(), Some(ping.as_path()));
        assert!(registry.find("draft").await.is_none());
        assert!(registry.find("deep").await.is_none());
    }

    #[tokio::test]
    async fn test_bad_file_does_not_abort_scan() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "a_broken.toml", "[command]\nreply = \"no name\"\n");
        write_file(
            dir.path(),
            "b_ok.yaml",
            "command:\n  name: ok\n  reply: fine\n",
        );

        let (registry, mut events) = registry();
        let report = registry.load_directory(dir.path()).await.unwrap();

        assert_eq!(report.loaded, vec![CommandName::named("ok")]);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].0.ends_with("a_broken.toml"));
        assert!(matches!(*report.failed[0].1, Error::InvalidCommandModule { .. }));
        assert!(matches!(events.try_recv(), Ok(ClientEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let (registry, _events) = registry();
        let result = registry.load_directory(Path::new("/definitely/not/here")).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_reload_unchanged_files_keeps_names() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "ping.toml",
            "[command]\nname = \"ping\"\naliases = [\"p\"]\nreply = \"pong\"\n",
        );
        write_file(
            dir.path(),
            "hello.toml",
            "[command]\nname = \"hello\"\nreply = \"hi {author}\"\n",
        );

        let (registry, _events) = registry();
        registry.register(Command::new("manual", noop)).await.unwrap();
        registry.load_directory(dir.path()).await.unwrap();

        let mut before = registry.names().await;
        let old_ping = registry.find("ping").await.unwrap();
        let report = registry.reload_tracked().await.unwrap();
        let mut after = registry.names().await;

        assert!(report.is_clean());
        assert_eq!(report.loaded.len(), 2);
        before.sort_by_key(|n| n.to_string());
        after.sort_by_key(|n| n.to_string());
        assert_eq!(before, after);
        assert_eq!(registry.len().await, 3);
        assert!(!Arc::ptr_eq(&old_ping, &registry.find("ping").await.unwrap()));
    }

    #[tokio::test]
    async fn test_reload_picks_up_redefinition() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "greet.toml",
            "[command]\nname = \"greet\"\nreply = \"hi\"\n",
        );

        let (registry, _events) = registry();
        registry.load_directory(dir.path()).await.unwrap();

        write_file(
            dir.path(),
            "greet.toml",
            "[command]\nname = \"greet\"\naliases = [\"hey\"]\nreply = \"hello\"\n",
        );
        registry.reload_tracked().await.unwrap();

        assert_eq!(registry.len().await, 1);
        let cmd = registry.find("hey").await.unwrap();
        assert_eq!(cmd.filename(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_command() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "greet.toml",
            "[command]\nname = \"greet\"\nreply = \"hi\"\n",
        );

        let (registry, _events) = registry();
        registry.register(Command::new("taken", noop)).await.unwrap();
        registry.load_directory(dir.path()).await.unwrap();

        write_file(dir.path(), "greet.toml", "this is not toml = = =");
        let report = registry.reload_tracked().await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(registry.find("greet").await.is_some());

        write_file(
            dir.path(),
            "greet.toml",
            "[command]\nname = \"greet\"\naliases = [\"taken\"]\nreply = \"hi\"\n",
        );
        let report = registry.reload_tracked().await.unwrap();
        assert!(matches!(*report.failed[0].1, Error::DuplicateName { .. }));
        assert_eq!(registry.len().await, 2);
        assert!(registry.find("greet").await.is_some());
    }
}
