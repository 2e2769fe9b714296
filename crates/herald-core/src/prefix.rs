//! Prefix resolution
//!
//! Decides whether a message is addressed to the bot and splits off the
//! prefix. Checks run in a fixed order: the contextual prefix, then a
//! mention of the bot, then the direct-message fallback.

use regex::Regex;

use crate::message::{IncomingMessage, UserId};

/// How the prefix was recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixKind {
    /// The contextual text prefix (may be empty in direct messages)
    Text,
    /// A mention of the bot
    Mention,
    /// No prefix at all, accepted because the channel is a direct message
    DirectMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatch {
    pub prefix: String,
    pub remainder: String,
    pub kind: PrefixKind,
}

impl PrefixMatch {
    fn new(prefix: &str, remainder: &str, kind: PrefixKind) -> Self {
        Self {
            prefix: prefix.to_string(),
            remainder: remainder.to_string(),
            kind,
        }
    }
}

/// Build the pattern matching a leading mention of `bot_id`, with any
/// whitespace that follows it
pub fn mention_pattern(bot_id: UserId) -> Option<Regex> {
    Regex::new(&format!(r"^<@!?{}>\s*", bot_id)).ok()
}

pub struct PrefixResolver<'a> {
    default_prefix: &'a str,
    mention: Option<&'a Regex>,
}

impl<'a> PrefixResolver<'a> {
    /// `mention` is `None` when mention prefixes are disabled or the bot's
    /// identity is not known yet
    pub fn new(default_prefix: &'a str, mention: Option<&'a Regex>) -> Self {
        Self {
            default_prefix,
            mention,
        }
    }

    /// The prefix expected in the message's channel
    pub fn contextual_prefix(&self, message: &IncomingMessage) -> &'a str {
        if message.is_direct() {
            ""
        } else {
            self.default_prefix
        }
    }

    /// `None` means the message is not a command invocation
    pub fn resolve(&self, message: &IncomingMessage) -> Option<PrefixMatch> {
        let content = message.content.as_str();

        let prefix = self.contextual_prefix(message);
        if let Some(rest) = content.strip_prefix(prefix) {
            return Some(PrefixMatch::new(prefix, rest, PrefixKind::Text));
        }

        if let Some(found) = self.mention.and_then(|re| re.find(content)) {
            return Some(PrefixMatch::new(
                found.as_str(),
                &content[found.end()..],
                PrefixKind::Mention,
            ));
        }

        if message.is_direct() {
            return Some(PrefixMatch::new("", content, PrefixKind::DirectMessage));
        }

        None
    }
}
