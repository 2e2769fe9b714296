//! Ready-made permission predicates

use std::sync::Arc;

use crate::command::PermissionCheck;

/// Only the application owner or a configured owner id may run the command
pub fn owner_only() -> PermissionCheck {
    Arc::new(|message, _args, ctx| {
        message
            .author
            .as_ref()
            .is_some_and(|author| ctx.client().is_owner(author.id))
    })
}

/// Refuse the command in direct messages
pub fn guild_only() -> PermissionCheck {
    Arc::new(|message, _args, _ctx| !message.is_direct())
}
