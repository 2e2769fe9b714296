//! Reply to a bare mention of the bot with the prefix to use

use std::sync::Arc;

use herald_core::{CommandContext, IncomingMessage};

pub async fn mention_hint(
    message: Arc<IncomingMessage>,
    _args: Vec<String>,
    ctx: CommandContext,
) -> anyhow::Result<()> {
    let prefix = ctx.client().default_prefix();
    let text = format!(
        "My prefix here is `{0}`. Try `{0}help` for a list of commands.",
        prefix
    );
    ctx.reply(&message, &text).await;
    Ok(())
}
