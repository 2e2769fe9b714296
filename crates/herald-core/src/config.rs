//! Configuration management
//!
//! Settings are resolved in this order of precedence:
//! 1. Environment variables
//! 2. `herald.toml`
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the TOML file is replaced with the value of the
//! environment variable before parsing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::client::{ClientOptions, default_exclude_pattern, default_prefix};
use crate::message::UserId;
use crate::Error;

/// Default config file looked up by [`HeraldConfig::load`]
pub const DEFAULT_CONFIG_FILE: &str = "herald.toml";

/// Main configuration for herald
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeraldConfig {
    /// Discord bot token
    #[serde(skip_serializing)]
    pub discord_token: Option<String>,

    /// Dispatcher behaviour
    #[serde(default)]
    pub client: ClientOptions,

    /// Directory scanned for command manifests at startup
    #[serde(default)]
    pub commands_dir: Option<PathBuf>,
}

impl Default for HeraldConfig {
    fn default() -> Self {
        Self {
            discord_token: None,
            client: ClientOptions::default(),
            commands_dir: None,
        }
    }
}

impl HeraldConfig {
    /// Replace `${VAR_NAME}` with the variable's value (empty if unset)
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Parse TOML content (after `${VAR}` expansion) without env overrides
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let toml: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Ok(Self::from_toml_config(toml))
    }

    /// Load `herald.toml` from the working directory if present, otherwise
    /// the environment only
    pub fn load() -> crate::Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Ok(Self::from_env())
    }

    /// Configuration from environment variables over defaults
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let discord = toml.discord.unwrap_or_default();
        let commands = toml.commands.unwrap_or_default();

        let client = ClientOptions {
            default_prefix: commands.prefix.unwrap_or_else(default_prefix),
            allow_mention: commands.allow_mention.unwrap_or(true),
            ignore_bots: commands.ignore_bots.unwrap_or(true),
            exclude_pattern: commands.exclude.unwrap_or_else(default_exclude_pattern),
            owner_ids: discord.owner_ids.unwrap_or_default(),
        };

        Self {
            discord_token: discord.token.filter(|t| !t.is_empty()),
            client,
            commands_dir: commands.dir.map(PathBuf::from),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("DISCORD_BOT_TOKEN") {
            if !token.is_empty() {
                self.discord_token = Some(token);
            }
        }

        if let Ok(ids) = std::env::var("HERALD_OWNER_IDS") {
            self.client.owner_ids = ids
                .split(',')
                .filter_map(|s| s.trim().parse::<UserId>().ok())
                .collect();
        }

        if let Ok(prefix) = std::env::var("HERALD_PREFIX") {
            self.client.default_prefix = prefix;
        }
        if let Ok(allow) = std::env::var("HERALD_ALLOW_MENTION") {
            self.client.allow_mention = allow.to_lowercase() != "false";
        }
        if let Ok(ignore) = std::env::var("HERALD_IGNORE_BOTS") {
            self.client.ignore_bots = ignore.to_lowercase() != "false";
        }
        if let Ok(pattern) = std::env::var("HERALD_EXCLUDE") {
            self.client.exclude_pattern = pattern;
        }

        if let Ok(dir) = std::env::var("HERALD_COMMANDS_DIR") {
            if !dir.is_empty() {
                self.commands_dir = Some(PathBuf::from(dir));
            }
        }
    }
}

// ============================================================================
// TOML file layout
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    discord: Option<TomlDiscordConfig>,
    commands: Option<TomlCommandsConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDiscordConfig {
    token: Option<String>,
    owner_ids: Option<Vec<UserId>>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlCommandsConfig {
    prefix: Option<String>,
    allow_mention: Option<bool>,
    ignore_bots: Option<bool>,
    dir: Option<String>,
    exclude: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HeraldConfig::default();
        assert!(config.discord_token.is_none());
        assert_eq!(config.client.default_prefix, "!");
        assert_eq!(config.client.exclude_pattern, "^[._]");
        assert!(config.commands_dir.is_none());
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("HERALD_TEST_VAR", "test_value");
        }

        let result = HeraldConfig::expand_env_vars("prefix_${HERALD_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        let result = HeraldConfig::expand_env_vars("prefix_${HERALD_NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("HERALD_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        assert_eq!(HeraldConfig::expand_env_vars("cost: $5"), "cost: $5");
    }

    #[test]
    fn test_expand_env_vars_empty_name() {
        assert_eq!(HeraldConfig::expand_env_vars("${}_content"), "_content");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[discord]
token = "discord_token"
owner_ids = [123456, 789012]

[commands]
prefix = "?"
allow_mention = false
ignore_bots = false
dir = "commands"
exclude = "^_"
"#;

        let config = HeraldConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.discord_token.as_deref(), Some("discord_token"));
        assert_eq!(config.client.owner_ids, vec![123456, 789012]);
        assert_eq!(config.client.default_prefix, "?");
        assert!(!config.client.allow_mention);
        assert!(!config.client.ignore_bots);
        assert_eq!(config.client.exclude_pattern, "^_");
        assert_eq!(config.commands_dir, Some(PathBuf::from("commands")));
    }

    #[test]
    fn test_toml_sections_are_optional() {
        let config = HeraldConfig::from_toml_str("").unwrap();
        assert_eq!(config.client.default_prefix, "!");
        assert!(config.client.allow_mention);
        assert!(config.client.ignore_bots);
    }

    #[test]
    fn test_empty_token_counts_as_unset() {
        let config = HeraldConfig::from_toml_str("[discord]\ntoken = \"\"\n").unwrap();
        assert!(config.discord_token.is_none());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = HeraldConfig::from_toml_str("[commands\nprefix = 1");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
