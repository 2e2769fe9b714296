//! Per-invocation command context
//!
//! Every handler call receives a fresh [`CommandContext`] holding a handle
//! to the client, the token the command was invoked with, and a copy of the
//! custom fields registered through [`Client::extend_context`].

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::client::Client;
use crate::command::CommandName;
use crate::event::{ClientEvent, EventContext};
use crate::message::IncomingMessage;
use crate::transport::Delivery;
use crate::Result;

/// A shared value stored in the context's custom fields
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// Context passed explicitly to every handler
#[derive(Clone)]
pub struct CommandContext {
    client: Client,
    invoked_as: CommandName,
    fields: HashMap<String, ContextValue>,
}

impl CommandContext {
    /// Build a context from the client's current base fields
    ///
    /// The field map is copied; the values themselves are `Arc`s, so shared
    /// resources (a database pool, an HTTP client) stay shared while inserts
    /// on one context never show up in another.
    pub(crate) fn build(client: &Client, invoked_as: CommandName) -> Self {
        Self {
            client: client.clone(),
            invoked_as,
            fields: client.context_base(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The literal name or alias used, or the sentinel for a bare mention
    pub fn invoked_as(&self) -> &CommandName {
        &self.invoked_as
    }

    /// Typed access to a custom field
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.fields.get(key).cloned()?.downcast::<T>().ok()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Insert a field visible to this invocation only
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.fields.insert(key.into(), Arc::new(value));
    }

    /// Send a message to a channel, propagating failure to the caller
    pub async fn say(&self, channel_id: u64, content: &str) -> Result<()> {
        self.client
            .transport()
            .send_message(channel_id, content)
            .await?;
        Ok(())
    }

    /// Reply in the message's channel, falling back to a direct message
    ///
    /// If both sends fail the failure is swallowed and reported as a `warn`
    /// event; the caller only learns where (or whether) the reply landed.
    pub async fn reply(&self, message: &IncomingMessage, content: &str) -> Delivery {
        let transport = self.client.transport();

        let channel_err = match transport.send_message(message.channel_id, content).await {
            Ok(()) => return Delivery::Channel,
            Err(e) => e,
        };

        let Some(author) = message.author.as_ref() else {
            self.report_dropped(message, channel_err.to_string());
            return Delivery::Dropped;
        };

        warn!(
            channel = message.channel_id,
            error = %channel_err,
            "Channel send failed, retrying via direct message"
        );

        match transport.send_direct_message(author.id, content).await {
            Ok(()) => Delivery::DirectMessage,
            Err(dm_err) => {
                self.report_dropped(message, format!("{}; {}", channel_err, dm_err));
                Delivery::Dropped
            }
        }
    }

    fn report_dropped(&self, message: &IncomingMessage, reason: String) {
        warn!(channel = message.channel_id, %reason, "Reply dropped");
        self.client.emit(ClientEvent::Warn {
            message: format!("reply dropped: {}", reason),
            context: EventContext::for_message(message).with_command(self.invoked_as.clone()),
        });
    }
}
