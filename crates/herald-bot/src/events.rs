//! Event logging
//!
//! Subscribes to the client's lifecycle events and turns them into log
//! lines. Runs until the client (and with it the event sender) is dropped.

use herald_core::ClientEvent;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub fn spawn_event_logger(mut events: Receiver<ClientEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger fell behind; events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Event stream closed");
    })
}

fn log_event(event: &ClientEvent) {
    match event {
        ClientEvent::CommandLoaded(command) => match command.filename() {
            Some(path) => info!(command = %command.name(), path = %path.display(), "Command registered"),
            None => info!(command = %command.name(), "Command registered"),
        },
        ClientEvent::Ready => info!("Client ready"),
        ClientEvent::PreCommand { command, message } => {
            debug!(command = %command.name(), channel = message.channel_id, "Running command");
        }
        ClientEvent::Command { command, message } => {
            debug!(command = %command.name(), channel = message.channel_id, "Command finished");
        }
        ClientEvent::Error { error, context } => error!(%context, "{}", error),
        ClientEvent::Warn { message, context } => warn!(%context, "{}", message),
    }
}
