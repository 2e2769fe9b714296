//! Discord bot wiring: a herald client bound to a Serenity gateway connection

use std::sync::Arc;

use serenity::Client as GatewayClient;
use serenity::http::Http;
use serenity::model::gateway::GatewayIntents;
use tracing::info;

use herald_core::{Client, HeraldConfig, ManifestLoader};

use crate::commands::handler_table;
use crate::error::{DiscordError, Result};
use crate::handler::Handler;
use crate::transport::SerenityTransport;

pub struct HeraldBot {
    token: String,
    client: Client,
}

impl HeraldBot {
    /// Build the herald client for Discord
    ///
    /// Manifests are resolved against the built-in handler table. Built-in
    /// commands and the commands directory are registered by the caller
    /// through [`client`](Self::client).
    pub fn new(config: &HeraldConfig) -> Result<Self> {
        let token = config
            .discord_token
            .clone()
            .ok_or(DiscordError::TokenNotSet)?;

        let http = Arc::new(Http::new(&token));
        let client = Client::builder(Arc::new(SerenityTransport::new(http)))
            .options(config.client.clone())
            .loader(Arc::new(ManifestLoader::new(handler_table())))
            .build()?;

        Ok(Self { token, client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Connect to the gateway and run until the connection ends
    pub async fn start(&self) -> Result<()> {
        // - GUILD_MESSAGES: Receive messages in guild channels
        // - DIRECT_MESSAGES: Receive direct messages
        // - MESSAGE_CONTENT: Read message content (privileged intent)
        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        info!("Starting Discord bot...");

        let mut gateway = GatewayClient::builder(&self.token, intents)
            .event_handler(Handler::new(self.client.clone()))
            .await?;

        gateway.start().await?;

        Ok(())
    }
}
