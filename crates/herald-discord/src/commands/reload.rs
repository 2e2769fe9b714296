//! `reload`: re-read every command that came from a file

use std::sync::Arc;

use tracing::info;

use herald_core::{CommandContext, IncomingMessage};

pub async fn reload(
    message: Arc<IncomingMessage>,
    _args: Vec<String>,
    ctx: CommandContext,
) -> anyhow::Result<()> {
    let report = ctx.client().reload_tracked().await?;
    info!(
        loaded = report.loaded.len(),
        failed = report.failed.len(),
        "Reload requested from chat"
    );

    let mut text = format!("Reloaded {} command(s).", report.loaded.len());
    for (path, error) in &report.failed {
        text.push_str(&format!("\nFailed: {}: {}", path.display(), error));
    }

    ctx.reply(&message, &text).await;
    Ok(())
}
