//! [`Transport`] implementation on top of the Serenity HTTP client

use std::sync::Arc;

use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::id::{ChannelId as DiscordChannelId, UserId as DiscordUserId};

use herald_core::{ApplicationInfo, BotIdentity, ChannelId, Error, SendFailure, Transport, UserId};

pub struct SerenityTransport {
    http: Arc<Http>,
}

impl SerenityTransport {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }
}

#[async_trait]
impl Transport for SerenityTransport {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), SendFailure> {
        let target = format!("channel {}", channel_id);
        // Serenity ids are non-zero; `new(0)` panics.
        if channel_id == 0 {
            return Err(SendFailure::new(target, "invalid channel id"));
        }

        DiscordChannelId::new(channel_id)
            .say(&*self.http, content)
            .await
            .map_err(|e| SendFailure::new(target, e.to_string()))?;
        Ok(())
    }

    async fn send_direct_message(&self, user_id: UserId, content: &str) -> Result<(), SendFailure> {
        let target = format!("user {}", user_id);
        if user_id == 0 {
            return Err(SendFailure::new(target, "invalid user id"));
        }

        let channel = DiscordUserId::new(user_id)
            .create_dm_channel(&*self.http)
            .await
            .map_err(|e| SendFailure::new(target.clone(), e.to_string()))?;

        channel
            .id
            .say(&*self.http, content)
            .await
            .map_err(|e| SendFailure::new(target, e.to_string()))?;
        Ok(())
    }

    async fn current_user(&self) -> herald_core::Result<BotIdentity> {
        let user = self
            .http
            .get_current_user()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(BotIdentity {
            id: user.id.get(),
            name: user.name.clone(),
        })
    }

    async fn application_info(&self) -> herald_core::Result<ApplicationInfo> {
        let info = self
            .http
            .get_current_application_info()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(ApplicationInfo {
            id: info.id.get(),
            name: info.name,
            description: info.description,
            owner_id: info.owner.as_ref().map(|owner| owner.id.get()),
            owner_name: info.owner.map(|owner| owner.name),
        })
    }
}
