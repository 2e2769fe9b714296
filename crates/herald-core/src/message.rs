//! Inbound message model
//!
//! The dispatcher only looks at the author (present / bot), whether the
//! channel belongs to a guild, and the raw text content. Transport adapters
//! convert their native message type into [`IncomingMessage`].

pub type UserId = u64;
pub type ChannelId = u64;
pub type GuildId = u64;
pub type MessageId = u64;

/// Author of an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    /// Whether the author is a bot account
    pub bot: bool,
}

impl Author {
    pub fn user(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bot: false,
        }
    }

    pub fn bot(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bot: true,
        }
    }
}

/// A "message received" notification from the gateway
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: MessageId,
    /// `None` for system and webhook messages
    pub author: Option<Author>,
    pub channel_id: ChannelId,
    /// `None` in direct-message channels
    pub guild_id: Option<GuildId>,
    pub content: String,
}

impl IncomingMessage {
    /// A message posted in a guild channel
    pub fn guild(
        guild_id: GuildId,
        channel_id: ChannelId,
        author: Author,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            author: Some(author),
            channel_id,
            guild_id: Some(guild_id),
            content: content.into(),
        }
    }

    /// A message posted in a direct-message channel
    pub fn direct(channel_id: ChannelId, author: Author, content: impl Into<String>) -> Self {
        Self {
            id: 0,
            author: Some(author),
            channel_id,
            guild_id: None,
            content: content.into(),
        }
    }

    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }

    pub fn author_is_bot(&self) -> bool {
        self.author.as_ref().is_some_and(|a| a.bot)
    }
}
