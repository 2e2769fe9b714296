//! Console mode
//!
//! Runs the dispatcher against the terminal instead of Discord. Every line
//! typed is delivered as a direct message from the console user, so the
//! empty direct-message prefix applies: type `ping`, not `!ping`. Lines
//! starting with `/` are console commands.

use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use herald_core::{
    ApplicationInfo, Author, BotIdentity, ChannelId, Client, DispatchOutcome, IncomingMessage,
    SendFailure, Transport, UserId,
};
use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, EditCommand, Emacs, KeyCode, KeyModifiers, Keybindings,
    MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch, Reedline, ReedlineEvent,
    ReedlineMenu, Signal, Span, Suggestion,
};
use tracing::info;

pub const CONSOLE_BOT_ID: UserId = 1000;
pub const CONSOLE_USER_ID: UserId = 1;
pub const CONSOLE_CHANNEL_ID: ChannelId = 1;

/// Console commands, handled before dispatch
const META_COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show console help"),
    ("/reload", "Reload commands loaded from files"),
    ("/exit", "Quit"),
    ("/quit", "Quit"),
];

// ============================================================================
// Transport
// ============================================================================

/// Writes bot output to a terminal (or any writer)
pub struct ConsoleTransport {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleTransport {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    fn print(&self, target: String, text: &str) -> Result<(), SendFailure> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{}", text)
            .and_then(|()| out.flush())
            .map_err(|e| SendFailure::new(target, e.to_string()))
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), SendFailure> {
        self.print(
            format!("channel {}", channel_id),
            &format!("{}", Color::Green.paint(content)),
        )
    }

    async fn send_direct_message(&self, user_id: UserId, content: &str) -> Result<(), SendFailure> {
        self.print(
            format!("user {}", user_id),
            &format!("{} {}", Style::new().dimmed().paint("(direct)"), Color::Green.paint(content)),
        )
    }

    async fn current_user(&self) -> herald_core::Result<BotIdentity> {
        Ok(BotIdentity {
            id: CONSOLE_BOT_ID,
            name: "herald".to_string(),
        })
    }

    async fn application_info(&self) -> herald_core::Result<ApplicationInfo> {
        Ok(ApplicationInfo {
            id: CONSOLE_BOT_ID,
            name: "herald".to_string(),
            description: "Local console session".to_string(),
            owner_id: Some(CONSOLE_USER_ID),
            owner_name: Some("console".to_string()),
        })
    }
}

// ============================================================================
// Line editor
// ============================================================================

/// Completes console commands and registered command names
#[derive(Clone)]
pub struct CommandCompleter {
    candidates: Arc<RwLock<Vec<(String, String)>>>,
}

impl CommandCompleter {
    fn new(candidates: Arc<RwLock<Vec<(String, String)>>>) -> Self {
        Self { candidates }
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if line.is_empty() || line.contains(char::is_whitespace) {
            return Vec::new();
        }

        self.candidates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(name, _)| name.starts_with(line))
            .map(|(name, description)| Suggestion {
                value: name.clone(),
                description: Some(description.clone()).filter(|d| !d.is_empty()),
                span: Span::new(0, pos),
                append_whitespace: true,
                ..Default::default()
            })
            .collect()
    }
}

async fn completion_candidates(client: &Client) -> Vec<(String, String)> {
    let mut candidates: Vec<(String, String)> = META_COMMANDS
        .iter()
        .map(|(name, description)| (name.to_string(), description.to_string()))
        .collect();

    for command in client.registry().commands().await {
        if command.metadata().hidden {
            continue;
        }
        let description = command.metadata().description.clone().unwrap_or_default();
        for name in command.names().iter().filter_map(|n| n.as_str()) {
            candidates.push((name.to_string(), description.clone()));
        }
    }

    candidates
}

struct ConsolePrompt {
    style: Style,
}

impl ConsolePrompt {
    fn new() -> Self {
        Self {
            style: Color::Cyan.bold(),
        }
    }
}

impl Prompt for ConsolePrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(self.style.paint("herald> ").to_string())
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        Cow::Borrowed("")
    }
}

fn keybindings() -> Keybindings {
    let mut keybindings = Keybindings::new();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Edit(vec![EditCommand::Complete]),
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('c'), ReedlineEvent::CtrlC);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::CtrlD);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings
}

// ============================================================================
// Loop
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum LineAction {
    Continue,
    Exit,
}

/// Run the interactive console until `/exit` or Ctrl+D
pub async fn run_console(client: Client) -> anyhow::Result<()> {
    let candidates = Arc::new(RwLock::new(completion_candidates(&client).await));
    info!(commands = client.registry().len().await, "Starting console mode");

    print_welcome();

    let menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_menu")
            .with_columns(1)
            .with_column_width(Some(40))
            .with_only_buffer_difference(false),
    );
    let hinter = DefaultHinter::default().with_style(Style::new().dimmed());

    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new(candidates.clone())))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(hinter))
        .with_edit_mode(Box::new(Emacs::new(keybindings())));

    let prompt = ConsolePrompt::new();
    let mut next_id: u64 = 0;

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                next_id += 1;
                if handle_line(&client, line.trim(), next_id).await == LineAction::Exit {
                    break;
                }
                if line.trim() == "/reload" {
                    let refreshed = completion_candidates(&client).await;
                    *candidates.write().unwrap_or_else(PoisonError::into_inner) = refreshed;
                }
            }
            Ok(Signal::CtrlC) => {
                println!("^C");
            }
            Ok(Signal::CtrlD) => break,
            Err(err) => {
                eprintln!("\nerror: {}\n", err);
                break;
            }
        }
    }

    println!("\nBye!\n");
    Ok(())
}

async fn handle_line(client: &Client, input: &str, id: u64) -> LineAction {
    if input.is_empty() {
        return LineAction::Continue;
    }

    match input.to_lowercase().as_str() {
        "/exit" | "/quit" | "/q" => return LineAction::Exit,
        "/help" | "/?" => {
            print_help();
            return LineAction::Continue;
        }
        "/reload" => {
            match client.reload_tracked().await {
                Ok(report) => {
                    println!("Reloaded {} command(s).", report.loaded.len());
                    for (path, error) in &report.failed {
                        eprintln!("  {}: {}", path.display(), error);
                    }
                }
                Err(e) => eprintln!("Reload failed: {}", e),
            }
            return LineAction::Continue;
        }
        lower if lower.starts_with('/') => {
            eprintln!("Unknown console command: {}. Type /help for the list.", input);
            return LineAction::Continue;
        }
        _ => {}
    }

    let message = IncomingMessage::direct(
        CONSOLE_CHANNEL_ID,
        Author::user(CONSOLE_USER_ID, "console"),
        input,
    )
    .with_id(id);

    match client.dispatch(message).await {
        DispatchOutcome::CommandNotFound => {
            let name = input.split_whitespace().next().unwrap_or(input);
            eprintln!("Unknown command: {}. Type `help` for a list.", name);
        }
        DispatchOutcome::Denied => eprintln!("Permission denied."),
        _ => {}
    }

    LineAction::Continue
}

fn print_welcome() {
    let title = Color::Cyan.bold().paint("herald console");
    println!("{} v{}", title, env!("CARGO_PKG_VERSION"));
    println!("Type a command without prefix (e.g. `help`), /help for console commands.");
    println!();
}

fn print_help() {
    println!();
    for (name, description) in META_COMMANDS {
        println!("  {:<10} {}", name, description);
    }
    println!("  Anything else is dispatched as a direct message to the bot.");
    println!();
}
