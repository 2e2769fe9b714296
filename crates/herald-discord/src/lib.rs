//! herald-discord: Discord adapter for herald
//!
//! Connects a [`herald_core::Client`] to the Discord gateway through
//! Serenity 0.12 and ships the built-in commands (`ping`, `help`, `about`,
//! `reload` and the bare-mention hint).

pub mod bot;
pub mod commands;
pub mod convert;
pub mod error;
pub mod handler;
pub mod transport;

pub use bot::HeraldBot;
pub use error::{DiscordError, Result};
pub use transport::SerenityTransport;
