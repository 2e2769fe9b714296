//! Conversion from Serenity messages to herald's platform-neutral type

use serenity::model::channel::{Message, MessageType};

use herald_core::{Author, IncomingMessage};

/// Whether a message has a user author that commands should see
///
/// Webhook posts and system messages (joins, pins, boosts) carry a
/// placeholder author; they map to an authorless message so the dispatcher
/// ignores them.
pub fn has_user_author(kind: MessageType, from_webhook: bool) -> bool {
    !from_webhook && matches!(kind, MessageType::Regular | MessageType::InlineReply)
}

pub fn to_incoming(message: &Message) -> IncomingMessage {
    let author = has_user_author(message.kind, message.webhook_id.is_some()).then(|| Author {
        id: message.author.id.get(),
        name: message.author.name.clone(),
        bot: message.author.bot,
    });

    IncomingMessage {
        id: message.id.get(),
        author,
        channel_id: message.channel_id.get(),
        guild_id: message.guild_id.map(|id| id.get()),
        content: message.content.clone(),
    }
}
