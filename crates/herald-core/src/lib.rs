//! herald-core: command dispatch for chat bots
//!
//! Holds the platform-independent half of herald: prefix resolution, the
//! command registry and manifest loader, per-invocation context, and the
//! lifecycle event stream. Platform adapters implement [`Transport`] and
//! feed messages into [`Client::dispatch`].

pub mod client;
pub mod command;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod loader;
pub mod message;
pub mod permission;
pub mod prefix;
pub mod registry;
pub mod transport;

pub use client::{Client, ClientBuilder, ClientOptions};
pub use command::{Command, CommandHandler, CommandMetadata, CommandName, PermissionCheck};
pub use config::HeraldConfig;
pub use context::{CommandContext, ContextValue};
pub use dispatcher::DispatchOutcome;
pub use error::{Error, Result, SendFailure};
pub use event::{ClientEvent, EventContext};
pub use loader::{CommandLoader, HandlerTable, ManifestLoader, ReplyTemplate};
pub use message::{Author, ChannelId, GuildId, IncomingMessage, MessageId, UserId};
pub use prefix::{PrefixKind, PrefixMatch, PrefixResolver};
pub use registry::{CommandRegistry, LoadReport};
pub use transport::{ApplicationInfo, BotIdentity, Delivery, Transport};
