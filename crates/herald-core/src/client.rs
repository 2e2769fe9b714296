//! Client and session state
//!
//! The [`Client`] owns the command registry, the session state learned from
//! the gateway (own identity, application info), the base context fields
//! and the event channel. It is a cheap handle; clones share everything.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::command::Command;
use crate::context::ContextValue;
use crate::event::{ClientEvent, EVENT_CHANNEL_CAPACITY, EventContext};
use crate::loader::{CommandLoader, HandlerTable, ManifestLoader};
use crate::message::UserId;
use crate::prefix::mention_pattern;
use crate::registry::{CommandRegistry, LoadReport};
use crate::transport::{ApplicationInfo, BotIdentity, Transport};
use crate::{Error, Result};

/// Behaviour switches fixed at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOptions {
    #[serde(default = "default_prefix")]
    pub default_prefix: String,

    /// Accept a mention of the bot as a prefix
    #[serde(default = "default_true")]
    pub allow_mention: bool,

    /// Drop messages authored by other bot accounts
    #[serde(default = "default_true")]
    pub ignore_bots: bool,

    /// File names matching this pattern are skipped by directory scans
    #[serde(default = "default_exclude_pattern")]
    pub exclude_pattern: String,

    /// Users treated as owners in addition to the application owner
    #[serde(default)]
    pub owner_ids: Vec<UserId>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            default_prefix: default_prefix(),
            allow_mention: true,
            ignore_bots: true,
            exclude_pattern: default_exclude_pattern(),
            owner_ids: Vec::new(),
        }
    }
}

pub(crate) fn default_prefix() -> String {
    "!".to_string()
}

pub(crate) fn default_exclude_pattern() -> String {
    "^[._]".to_string()
}

fn default_true() -> bool {
    true
}

/// State only known once the gateway is connected
#[derive(Debug, Default)]
struct SessionState {
    identity: Option<BotIdentity>,
    mention: Option<Regex>,
    application: Option<ApplicationInfo>,
}

struct ClientInner {
    options: ClientOptions,
    registry: CommandRegistry,
    transport: Arc<dyn Transport>,
    session: RwLock<SessionState>,
    context_base: RwLock<HashMap<String, ContextValue>>,
    events: broadcast::Sender<ClientEvent>,
}

#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    options: ClientOptions,
    loader: Option<Arc<dyn CommandLoader>>,
}

impl ClientBuilder {
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Loader used for directory scans and hot-reload
    ///
    /// Defaults to a [`ManifestLoader`] with an empty handler table, which
    /// only supports reply-template manifests.
    pub fn loader(mut self, loader: Arc<dyn CommandLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn build(self) -> Result<Client> {
        let exclude = Regex::new(&self.options.exclude_pattern).map_err(|e| {
            Error::Config(format!(
                "invalid exclude pattern '{}': {}",
                self.options.exclude_pattern, e
            ))
        })?;
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(ManifestLoader::new(HandlerTable::new())));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Client {
            inner: Arc::new(ClientInner {
                registry: CommandRegistry::new(loader, exclude, events.clone()),
                options: self.options,
                transport: self.transport,
                session: RwLock::new(SessionState::default()),
                context_base: RwLock::new(HashMap::new()),
                events,
            }),
        })
    }
}

impl Client {
    pub fn builder(transport: Arc<dyn Transport>) -> ClientBuilder {
        ClientBuilder {
            transport,
            options: ClientOptions::default(),
            loader: None,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub fn default_prefix(&self) -> &str {
        &self.inner.options.default_prefix
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.inner.registry
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        let _ = self.inner.events.send(event);
    }

    pub async fn register(&self, command: Command) -> Result<Arc<Command>> {
        self.inner.registry.register(command).await
    }

    pub async fn load_directory(&self, dir: impl AsRef<std::path::Path>) -> Result<LoadReport> {
        self.inner.registry.load_directory(dir.as_ref()).await
    }

    pub async fn reload_tracked(&self) -> Result<LoadReport> {
        self.inner.registry.reload_tracked().await
    }

    /// Merge custom fields into the base of every future context
    pub fn extend_context<I>(&self, fields: I)
    where
        I: IntoIterator<Item = (String, ContextValue)>,
    {
        self.inner
            .context_base
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(fields);
    }

    pub(crate) fn context_base(&self) -> HashMap<String, ContextValue> {
        self.inner
            .context_base
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Own identity, once [`on_ready`](Self::on_ready) has run
    pub fn identity(&self) -> Option<BotIdentity> {
        self.session().identity.clone()
    }

    /// Application info, once [`on_ready`](Self::on_ready) has run. Callers
    /// must cope with `None`: the fetch may also have failed.
    pub fn application_info(&self) -> Option<ApplicationInfo> {
        self.session().application.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.session().identity.is_some()
    }

    /// Mention pattern, if mentions are allowed and the identity is known
    pub(crate) fn mention_pattern(&self) -> Option<Regex> {
        if !self.inner.options.allow_mention {
            return None;
        }
        self.session().mention.clone()
    }

    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.inner.options.owner_ids.contains(&user_id)
            || self
                .session()
                .application
                .as_ref()
                .and_then(|app| app.owner_id)
                == Some(user_id)
    }

    /// Resolve own identity and application info after the gateway connects
    ///
    /// Emits `ready` once done. A failed application-info fetch is reported
    /// as a `warn` event and leaves the info unset; a failed identity lookup
    /// is an error and `ready` is not emitted.
    pub async fn on_ready(&self) -> Result<()> {
        let identity = match self.inner.transport.current_user().await {
            Ok(identity) => identity,
            Err(e) => {
                let message = e.to_string();
                self.emit(ClientEvent::error(e, EventContext::default()));
                return Err(Error::Transport(message));
            }
        };

        let application = match self.inner.transport.application_info().await {
            Ok(app) => Some(app),
            Err(e) => {
                warn!(error = %e, "Failed to fetch application info");
                self.emit(ClientEvent::Warn {
                    message: format!("application info unavailable: {}", e),
                    context: EventContext::default(),
                });
                None
            }
        };

        info!(
            user = %identity.name,
            id = identity.id,
            owner = ?application.as_ref().and_then(|a| a.owner_name.as_deref()),
            "Session ready"
        );

        {
            let mut session = self.inner.session.write().unwrap_or_else(PoisonError::into_inner);
            session.mention = mention_pattern(identity.id);
            session.identity = Some(identity);
            session.application = application;
        }

        self.emit(ClientEvent::Ready);
        Ok(())
    }

    fn session(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner.session.read().unwrap_or_else(PoisonError::into_inner)
    }
}
