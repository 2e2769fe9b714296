//! Outbound capabilities provided by the gateway client
//!
//! The core never talks to the network directly. An adapter crate implements
//! [`Transport`] on top of its gateway library.

use async_trait::async_trait;

use crate::error::SendFailure;
use crate::message::{ChannelId, UserId};
use crate::Result;

/// The bot's own account, known once the gateway reports ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: UserId,
    pub name: String,
}

/// Application details fetched alongside the identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
}

/// Where a reply ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Channel,
    /// The channel send failed and the author was messaged directly
    DirectMessage,
    /// Both attempts failed
    Dropped,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message to a channel
    async fn send_message(&self, channel_id: ChannelId, content: &str)
    -> std::result::Result<(), SendFailure>;

    /// Open (or reuse) a direct-message channel with a user and send to it
    async fn send_direct_message(&self, user_id: UserId, content: &str)
    -> std::result::Result<(), SendFailure>;

    /// Resolve the bot's own identity. Only valid after the gateway is ready.
    async fn current_user(&self) -> Result<BotIdentity>;

    /// Fetch application and owner details. Only valid after the gateway is ready.
    async fn application_info(&self) -> Result<ApplicationInfo>;
}
