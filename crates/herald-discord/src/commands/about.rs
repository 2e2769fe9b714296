//! `about`: application details

use std::sync::Arc;

use herald_core::{CommandContext, IncomingMessage};

pub async fn about(
    message: Arc<IncomingMessage>,
    _args: Vec<String>,
    ctx: CommandContext,
) -> anyhow::Result<()> {
    let client = ctx.client();
    let mut lines = Vec::new();

    match client.application_info() {
        Some(app) => {
            lines.push(format!("**{}**", app.name));
            if !app.description.is_empty() {
                lines.push(app.description);
            }
            if let Some(owner) = app.owner_name {
                lines.push(format!("Owner: {}", owner));
            }
        }
        None => lines.push("Application info is unavailable.".to_string()),
    }

    lines.push(format!(
        "herald v{} | {} commands loaded",
        env!("CARGO_PKG_VERSION"),
        client.registry().len().await
    ));

    ctx.reply(&message, &lines.join("\n")).await;
    Ok(())
}
