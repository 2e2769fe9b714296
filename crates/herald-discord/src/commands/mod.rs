//! Built-in commands
//!
//! Registered on every client. Most handlers are also exposed through
//! [`handler_table`] so command manifests can bind extra names to them.
//! `reload` is not: its owner check lives on the built-in command.

mod about;
mod help;
mod mention;
mod ping;
mod reload;

use herald_core::permission::owner_only;
use herald_core::{Client, Command, CommandMetadata, HandlerTable};

pub use about::about;
pub use help::help;
pub use mention::mention_hint;
pub use ping::ping;
pub use reload::reload;

/// Get all built-in commands for registration
pub fn builtin_commands() -> Vec<Command> {
    vec![
        Command::new("ping", ping).with_description("Check that the bot is responding"),
        Command::new("help", help)
            .with_alias("commands")
            .with_metadata(CommandMetadata {
                description: Some("List commands, or describe one".to_string()),
                usage: Some("[command]".to_string()),
                ..Default::default()
            }),
        Command::new("about", about)
            .with_alias("info")
            .with_description("Show information about this bot"),
        Command::new("reload", reload)
            .with_permission_check(owner_only())
            .with_metadata(CommandMetadata {
                description: Some("Reload commands loaded from files".to_string()),
                owner_only: true,
                ..Default::default()
            }),
        Command::bare_mention(mention_hint).with_metadata(CommandMetadata {
            description: Some("Reply to a bare mention with the prefix".to_string()),
            hidden: true,
            ..Default::default()
        }),
    ]
}

/// Handlers that command manifests may refer to by name
pub fn handler_table() -> HandlerTable {
    let mut table = HandlerTable::new();
    table.insert("ping", ping);
    table.insert("help", help);
    table.insert("about", about);
    table.insert("mention-hint", mention_hint);
    table
}

pub async fn register_builtins(client: &Client) -> herald_core::Result<()> {
    for command in builtin_commands() {
        client.register(command).await?;
    }
    Ok(())
}
