//! Message dispatch
//!
//! Turns one inbound message into at most one handler invocation. Every
//! message ends in exactly one [`DispatchOutcome`]; nothing a handler does
//! (returning an error, panicking) escapes this boundary.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, trace};

use crate::client::Client;
use crate::command::{Command, CommandName};
use crate::context::CommandContext;
use crate::event::{ClientEvent, EventContext};
use crate::message::IncomingMessage;
use crate::prefix::{PrefixKind, PrefixResolver};
use crate::Error;

/// Terminal state of a dispatched message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No author (system message) or a bot author while bots are ignored
    Ignored,
    /// Not addressed to the bot, or addressed with nothing after the prefix
    PrefixUnmatched,
    /// A bare mention with no mention command registered
    BareMention,
    CommandNotFound,
    /// The command's permission predicate refused the invocation
    Denied,
    /// The handler ran (successfully or not)
    Dispatched,
}

impl Client {
    /// Route a message to its command and run it
    ///
    /// Handlers are awaited here but never serialized against each other:
    /// the gateway adapter calls this once per message on its own task.
    pub async fn dispatch(&self, message: IncomingMessage) -> DispatchOutcome {
        let Some(author) = message.author.as_ref() else {
            trace!(message = message.id, "Ignoring message without author");
            return DispatchOutcome::Ignored;
        };
        if self.options().ignore_bots && author.bot {
            trace!(message = message.id, author = author.id, "Ignoring bot message");
            return DispatchOutcome::Ignored;
        }

        let mention = self.mention_pattern();
        let resolver = PrefixResolver::new(self.default_prefix(), mention.as_ref());
        let Some(matched) = resolver.resolve(&message) else {
            return DispatchOutcome::PrefixUnmatched;
        };

        let message = Arc::new(message);

        if matched.remainder.trim().is_empty() {
            if matched.kind != PrefixKind::Mention {
                return DispatchOutcome::PrefixUnmatched;
            }
            let Some(command) = self.registry().lookup(&CommandName::BareMention).await else {
                debug!(channel = message.channel_id, "Bare mention with no handler");
                return DispatchOutcome::BareMention;
            };
            return self
                .invoke(command, message, Vec::new(), CommandName::BareMention)
                .await;
        }

        let mut tokens = matched.remainder.split_whitespace();
        let Some(name) = tokens.next() else {
            return DispatchOutcome::PrefixUnmatched;
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let Some(command) = self.registry().find(name).await else {
            trace!(command = name, "Command not found");
            return DispatchOutcome::CommandNotFound;
        };

        self.invoke(command, message, args, CommandName::named(name))
            .await
    }

    async fn invoke(
        &self,
        command: Arc<Command>,
        message: Arc<IncomingMessage>,
        args: Vec<String>,
        invoked_as: CommandName,
    ) -> DispatchOutcome {
        let ctx = CommandContext::build(self, invoked_as.clone());

        if !command.permits(&message, &args, &ctx) {
            debug!(command = %command.name(), channel = message.channel_id, "Permission denied");
            return DispatchOutcome::Denied;
        }

        self.emit(ClientEvent::PreCommand {
            command: command.clone(),
            message: message.clone(),
        });
        debug!(command = %command.name(), invoked_as = %invoked_as, args = args.len(), "Dispatching command");

        let handler = command.handler();
        let result = AssertUnwindSafe(handler.call(message.clone(), args, ctx))
            .catch_unwind()
            .await;

        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(panic) => Some(anyhow::anyhow!("handler panicked: {}", panic_message(&*panic))),
        };

        if let Some(source) = failure {
            error!(command = %command.name(), error = %source, "Command failed");
            let context = EventContext::for_message(&message).with_command(invoked_as);
            self.emit(ClientEvent::error(
                Error::Handler {
                    command: command.name().to_string(),
                    source,
                },
                context,
            ));
        }

        self.emit(ClientEvent::Command { command, message });
        DispatchOutcome::Dispatched
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::{Notify, broadcast};
    use tokio::time::timeout;

    use super::*;
    use crate::message::Author;
    use crate::transport::mock::{MockTransport, Sent};
    use crate::{ClientOptions, CommandHandler};

    /// Records the args and invoked name of every call
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(Vec<String>, CommandName)>>,
    }

    #[async_trait::async_trait]
    impl CommandHandler for Recorder {
        async fn call(
            &self,
            _message: Arc<IncomingMessage>,
            args: Vec<String>,
            ctx: CommandContext,
        ) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((args, ctx.invoked_as().clone()));
            Ok(())
        }
    }

    struct Shared(Arc<Recorder>);

    #[async_trait::async_trait]
    impl CommandHandler for Shared {
        async fn call(
            &self,
            message: Arc<IncomingMessage>,
            args: Vec<String>,
            ctx: CommandContext,
        ) -> anyhow::Result<()> {
            self.0.call(message, args, ctx).await
        }
    }

    async fn ready_client() -> (Client, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let client = Client::builder(transport.clone())
            .options(ClientOptions::default())
            .build()
            .unwrap();
        client.on_ready().await.unwrap();
        (client, transport)
    }

    fn guild(content: &str) -> IncomingMessage {
        IncomingMessage::guild(1, 10, Author::user(7, "ana"), content)
    }

    fn drain(events: &mut broadcast::Receiver<ClientEvent>) -> Vec<&'static str> {
        let mut names = Vec::new();
        while let Ok(event) = events.try_recv() {
            names.push(event.name());
        }
        names
    }

    #[tokio::test]
    async fn test_dispatches_with_args() {
        let (client, _) = ready_client().await;
        let recorder = Arc::new(Recorder::default());
        client
            .register(Command::new("echo", Shared(recorder.clone())).with_alias("e"))
            .await
            .unwrap();
        let mut events = client.subscribe();

        let outcome = client.dispatch(guild("!e  one two   three")).await;

        assert_eq!(outcome, DispatchOutcome::Dispatched);
        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls[0].0, vec!["one", "two", "three"]);
        assert_eq!(calls[0].1, CommandName::named("e"));
        assert_eq!(drain(&mut events), vec!["pre-command", "command"]);
    }

    #[tokio::test]
    async fn test_system_message_is_ignored() {
        let (client, _) = ready_client().await;
        let mut msg = guild("!ping");
        msg.author = None;
        assert_eq!(client.dispatch(msg).await, DispatchOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_bot_author_is_ignored_unless_allowed() {
        let (client, _) = ready_client().await;
        client
            .register(Command::new("ping", Recorder::default()))
            .await
            .unwrap();
        let msg = IncomingMessage::guild(1, 10, Author::bot(8, "other"), "!ping");
        assert_eq!(client.dispatch(msg.clone()).await, DispatchOutcome::Ignored);

        let options = ClientOptions {
            ignore_bots: false,
            ..Default::default()
        };
        let open = Client::builder(Arc::new(MockTransport::new()))
            .options(options)
            .build()
            .unwrap();
        open.register(Command::new("ping", Recorder::default()))
            .await
            .unwrap();
        assert_eq!(open.dispatch(msg).await, DispatchOutcome::Dispatched);
    }

    #[tokio::test]
    async fn test_unprefixed_message() {
        let (client, _) = ready_client().await;
        assert_eq!(
            client.dispatch(guild("hello")).await,
            DispatchOutcome::PrefixUnmatched
        );
    }

    #[tokio::test]
    async fn test_prefix_alone_is_unmatched() {
        let (client, _) = ready_client().await;
        client.register(Command::bare_mention(Recorder::default())).await.unwrap();
        assert_eq!(client.dispatch(guild("!   ")).await, DispatchOutcome::PrefixUnmatched);
    }

    #[tokio::test]
    async fn test_bare_mention_dispatches_sentinel() {
        let (client, _) = ready_client().await;
        let recorder = Arc::new(Recorder::default());
        client
            .register(Command::bare_mention(Shared(recorder.clone())))
            .await
            .unwrap();

        let outcome = client.dispatch(guild("<@123>")).await;

        assert_eq!(outcome, DispatchOutcome::Dispatched);
        let calls = recorder.calls.lock().unwrap();
        assert!(calls[0].0.is_empty());
        assert_eq!(calls[0].1, CommandName::BareMention);
    }

    #[tokio::test]
    async fn test_bare_mention_without_sentinel() {
        let (client, _) = ready_client().await;
        assert_eq!(
            client.dispatch(guild("<@!123>  ")).await,
            DispatchOutcome::BareMention
        );
    }

    #[tokio::test]
    async fn test_mention_before_ready_is_unmatched() {
        let client = Client::builder(Arc::new(MockTransport::new())).build().unwrap();
        client.register(Command::bare_mention(Recorder::default())).await.unwrap();
        assert_eq!(
            client.dispatch(guild("<@123>")).await,
            DispatchOutcome::PrefixUnmatched
        );
    }

    #[tokio::test]
    async fn test_mention_then_command() {
        let (client, _) = ready_client().await;
        let recorder = Arc::new(Recorder::default());
        client
            .register(Command::new("ping", Shared(recorder.clone())))
            .await
            .unwrap();
        assert_eq!(
            client.dispatch(guild("<@123> ping x")).await,
            DispatchOutcome::Dispatched
        );
        assert_eq!(recorder.calls.lock().unwrap()[0].0, vec!["x"]);
    }

    #[tokio::test]
    async fn test_direct_message_needs_no_prefix() {
        let (client, _) = ready_client().await;
        client
            .register(Command::new("ping", Recorder::default()))
            .await
            .unwrap();
        let msg = IncomingMessage::direct(11, Author::user(7, "ana"), "ping");
        assert_eq!(client.dispatch(msg).await, DispatchOutcome::Dispatched);
    }

    #[tokio::test]
    async fn test_command_not_found_emits_nothing() {
        let (client, transport) = ready_client().await;
        let mut events = client.subscribe();

        assert_eq!(
            client.dispatch(guild("!nonexistent")).await,
            DispatchOutcome::CommandNotFound
        );
        assert!(drain(&mut events).is_empty());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let (client, _) = ready_client().await;
        let recorder = Arc::new(Recorder::default());
        client
            .register(
                Command::new("admin", Shared(recorder.clone()))
                    .with_permission(|msg, _args, _ctx| {
                        msg.author.as_ref().is_some_and(|a| a.id == 1)
                    }),
            )
            .await
            .unwrap();
        let mut events = client.subscribe();

        assert_eq!(client.dispatch(guild("!admin")).await, DispatchOutcome::Denied);
        assert!(recorder.calls.lock().unwrap().is_empty());
        assert!(drain(&mut events).is_empty());

        let owner = IncomingMessage::guild(1, 10, Author::user(1, "owner"), "!admin");
        assert_eq!(client.dispatch(owner).await, DispatchOutcome::Dispatched);
    }

    #[tokio::test]
    async fn test_handler_error_is_isolated() {
        let (client, transport) = ready_client().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        client
            .register(Command::new(
                "fail",
                |_m: Arc<IncomingMessage>, _a: Vec<String>, _c: CommandContext| async {
                    Err::<(), _>(anyhow::anyhow!("boom"))
                },
            ))
            .await
            .unwrap();
        client
            .register(Command::new(
                "count",
                move |m: Arc<IncomingMessage>, _a: Vec<String>, c: CommandContext| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        c.reply(&m, "counted").await;
                        Ok::<(), anyhow::Error>(())
                    }
                },
            ))
            .await
            .unwrap();
        let mut events = client.subscribe();

        assert_eq!(client.dispatch(guild("!fail")).await, DispatchOutcome::Dispatched);
        assert_eq!(drain(&mut events), vec!["pre-command", "error", "command"]);

        assert_eq!(client.dispatch(guild("!count")).await, DispatchOutcome::Dispatched);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.sent(), vec![Sent::Channel(10, "counted".to_string())]);
    }

    #[tokio::test]
    async fn test_handler_panic_is_caught() {
        let (client, _) = ready_client().await;
        client
            .register(Command::new(
                "panic",
                |_m: Arc<IncomingMessage>, _a: Vec<String>, _c: CommandContext| async {
                    if true {
                        panic!("kaboom");
                    }
                    Ok::<(), anyhow::Error>(())
                },
            ))
            .await
            .unwrap();
        let mut events = client.subscribe();

        assert_eq!(client.dispatch(guild("!panic")).await, DispatchOutcome::Dispatched);
        let _pre = events.try_recv().unwrap();
        match events.try_recv().unwrap() {
            ClientEvent::Error { error, context } => {
                assert!(error.to_string().contains("kaboom"));
                assert_eq!(context.command, Some(CommandName::named("panic")));
            }
            other => panic!("expected error event, got {}", other.name()),
        }
        assert!(matches!(events.try_recv(), Ok(ClientEvent::Command { .. })));
    }

    /// Signals when entered, then waits until released
    struct Parked {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl CommandHandler for Parked {
        async fn call(
            &self,
            _message: Arc<IncomingMessage>,
            _args: Vec<String>,
            _ctx: CommandContext,
        ) -> anyhow::Result<()> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_suspended_handler_does_not_block_dispatch_or_reload() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("greet.toml"),
            "[command]\nname = \"greet\"\nreply = \"hello\"\n",
        )
        .unwrap();

        let (client, transport) = ready_client().await;
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        client
            .register(Command::new(
                "slow",
                Parked {
                    entered: entered.clone(),
                    release: release.clone(),
                },
            ))
            .await
            .unwrap();
        client.load_directory(dir.path()).await.unwrap();

        let background = client.clone();
        let slow = tokio::spawn(async move { background.dispatch(guild("!slow")).await });
        entered.notified().await;

        let outcome = timeout(Duration::from_secs(2), client.dispatch(guild("!greet")))
            .await
            .expect("dispatch blocked by a suspended handler");
        assert_eq!(outcome, DispatchOutcome::Dispatched);
        assert_eq!(transport.sent(), vec![Sent::Channel(10, "hello".to_string())]);

        let report = timeout(Duration::from_secs(2), client.reload_tracked())
            .await
            .expect("reload blocked by a suspended handler")
            .unwrap();
        assert_eq!(report.loaded, vec![CommandName::named("greet")]);
        assert!(!slow.is_finished());

        release.notify_one();
        assert_eq!(slow.await.unwrap(), DispatchOutcome::Dispatched);
    }
}
