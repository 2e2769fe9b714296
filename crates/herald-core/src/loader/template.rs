//! Reply templates for manifest-defined commands

use std::sync::Arc;

use async_trait::async_trait;

use crate::command::CommandHandler;
use crate::context::CommandContext;
use crate::message::IncomingMessage;

/// Replies with a fixed text after placeholder substitution
///
/// Placeholders: `{author}` (author name), `{args}` (all arguments joined by
/// a space), `{0}`, `{1}`… (individual arguments, empty when missing) and
/// `{prefix}` (the client's default prefix).
#[derive(Debug, Clone)]
pub struct ReplyTemplate {
    template: String,
}

impl ReplyTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute placeholders in a single left-to-right pass
    ///
    /// Substituted text is never scanned again. Unknown tokens are kept
    /// verbatim.
    pub fn render(&self, message: &IncomingMessage, args: &[String], prefix: &str) -> String {
        let author = message.author.as_ref().map(|a| a.name.as_str()).unwrap_or("");
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                rest = &rest[start..];
                break;
            };

            let token = &after[..end];
            match token {
                "author" => out.push_str(author),
                "prefix" => out.push_str(prefix),
                "args" => push_joined(&mut out, args),
                _ => match positional(token) {
                    Some(index) => {
                        out.push_str(args.get(index).map(String::as_str).unwrap_or(""));
                    }
                    None => {
                        // Not a placeholder; keep the brace and rescan after it.
                        out.push('{');
                        rest = after;
                        continue;
                    }
                },
            }
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        out
    }
}

fn push_joined(out: &mut String, args: &[String]) {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(arg);
    }
}

/// Index of a `{N}` token; `None` for anything that is not plain digits
/// or does not fit a `usize`
fn positional(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

#[async_trait]
impl CommandHandler for ReplyTemplate {
    async fn call(
        &self,
        message: Arc<IncomingMessage>,
        args: Vec<String>,
        ctx: CommandContext,
    ) -> anyhow::Result<()> {
        let text = self.render(&message, &args, ctx.client().default_prefix());
        ctx.reply(&message, &text).await;
        Ok(())
    }
}
