//! Serenity event handler feeding the herald dispatcher

use async_trait::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use tracing::{debug, error, info};

use herald_core::Client;

use crate::convert::to_incoming;

pub struct Handler {
    client: Client,
}

impl Handler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "Connected to Discord");

        if let Err(e) = self.client.on_ready().await {
            error!(error = %e, "Failed to resolve bot identity; mention prefixes stay disabled");
        }
    }

    async fn message(&self, _ctx: Context, message: Message) {
        let incoming = to_incoming(&message);
        let outcome = self.client.dispatch(incoming).await;
        debug!(message = %message.id, ?outcome, "Message handled");
    }
}
