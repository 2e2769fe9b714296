//! Error types for herald-discord

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscordError {
    #[error("Discord token not set")]
    TokenNotSet,

    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error(transparent)]
    Core(#[from] herald_core::Error),
}

pub type Result<T> = std::result::Result<T, DiscordError>;
