//! `help`: list commands, or describe one
//!
//! Reads descriptions and usage from each command's metadata, so commands
//! loaded from manifests show up without extra wiring.

use std::sync::Arc;

use herald_core::{Command, CommandContext, IncomingMessage};

pub async fn help(
    message: Arc<IncomingMessage>,
    args: Vec<String>,
    ctx: CommandContext,
) -> anyhow::Result<()> {
    let prefix = if message.is_direct() {
        ""
    } else {
        ctx.client().default_prefix()
    };
    let registry = ctx.client().registry();

    let text = match args.first() {
        Some(name) => match registry.find(name).await {
            Some(command) if !command.metadata().hidden => describe(&command, prefix),
            _ => format!("No command named `{}`.", name),
        },
        None => list(&registry.commands().await, prefix),
    };

    ctx.reply(&message, &text).await;
    Ok(())
}

fn list(commands: &[Arc<Command>], prefix: &str) -> String {
    let mut lines = vec!["**Commands**".to_string()];

    for command in commands.iter().filter(|c| !c.metadata().hidden) {
        // the bare-mention sentinel has no name to type
        let Some(name) = command.name().as_str() else {
            continue;
        };
        match &command.metadata().description {
            Some(description) => lines.push(format!("`{}{}` - {}", prefix, name, description)),
            None => lines.push(format!("`{}{}`", prefix, name)),
        }
    }

    lines.push(format!("Use `{}help <command>` for details.", prefix));
    lines.join("\n")
}

fn describe(command: &Command, prefix: &str) -> String {
    let metadata = command.metadata();
    let mut header = format!("**{}{}**", prefix, command.name());
    if let Some(usage) = &metadata.usage {
        header.push(' ');
        header.push_str(usage);
    }

    let mut lines = vec![header];
    if let Some(description) = &metadata.description {
        lines.push(description.clone());
    }

    let aliases: Vec<&str> = command.aliases().collect();
    if !aliases.is_empty() {
        lines.push(format!("Aliases: {}", aliases.join(", ")));
    }
    if metadata.owner_only {
        lines.push("Only the bot owner can use this command.".to_string());
    }

    lines.join("\n")
}
