//! `ping`: liveness check

use std::sync::Arc;

use herald_core::{CommandContext, IncomingMessage};

pub async fn ping(
    message: Arc<IncomingMessage>,
    _args: Vec<String>,
    ctx: CommandContext,
) -> anyhow::Result<()> {
    ctx.reply(&message, "Pong!").await;
    Ok(())
}
