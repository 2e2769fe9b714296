//! Error types for herald-core

use std::path::PathBuf;

use thiserror::Error;

/// An outbound send rejected by the transport
#[derive(Error, Debug, Clone)]
#[error("failed to send message to {target}: {reason}")]
pub struct SendFailure {
    /// Human-readable destination (`channel 123`, `user 456`)
    pub target: String,
    pub reason: String,
}

impl SendFailure {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Main error type for herald-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Command name already registered: {name}")]
    DuplicateName { name: String },

    #[error("Invalid command module {}: {reason}", path.display())]
    InvalidCommandModule { path: PathBuf, reason: String },

    #[error(transparent)]
    Send(#[from] SendFailure),

    #[error("Command '{command}' failed: {source}")]
    Handler {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Client is not ready: own identity has not been resolved")]
    NotReady,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_module(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InvalidCommandModule {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for herald-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_module_names_the_file() {
        let err = Error::invalid_module("commands/broken.toml", "missing field `name`");
        let text = err.to_string();
        assert!(text.contains("commands/broken.toml"));
        assert!(text.contains("missing field `name`"));
    }

    #[test]
    fn test_send_failure_is_transparent() {
        let err: Error = SendFailure::new("channel 42", "Missing Access").into();
        assert_eq!(
            err.to_string(),
            "failed to send message to channel 42: Missing Access"
        );
    }
}
