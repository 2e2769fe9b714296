//! herald: command bot main binary
//!
//! Usage:
//!   herald                    - Connect to Discord
//!   herald --console          - Drive the bot from the terminal
//!   herald --config <path>    - Use a config file other than ./herald.toml
//!   herald --help             - Show help

mod console;
mod events;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use herald_core::{Client, HeraldConfig, ManifestLoader};
use herald_discord::HeraldBot;
use herald_discord::commands::{handler_table, register_builtins};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::console::ConsoleTransport;

/// Run mode
enum RunMode {
    /// Connect to the Discord gateway
    Discord,
    /// Interactive console mode
    Console,
    /// Show help
    Help,
    /// Show version
    Version,
}

struct Args {
    mode: RunMode,
    config_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    match args.mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("herald {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = match &args.config_path {
        Some(path) => HeraldConfig::from_toml_file(path),
        None => HeraldConfig::load(),
    }
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!(prefix = %config.client.default_prefix, "Starting herald...");

    match args.mode {
        RunMode::Console => run_console(config).await,
        RunMode::Discord => run_discord(config).await,
        _ => Ok(()),
    }
}

/// Parse command line arguments
fn parse_args() -> anyhow::Result<Args> {
    let mut mode = RunMode::Discord;
    let mut config_path = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--console" | "-c" => mode = RunMode::Console,
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config needs a path"))?;
                config_path = Some(PathBuf::from(path));
            }
            "--help" | "-h" => mode = RunMode::Help,
            "--version" | "-v" => mode = RunMode::Version,
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok(Args { mode, config_path })
}

/// Print help message
fn print_help() {
    println!("herald - prefix command bot");
    println!();
    println!("Usage:");
    println!("  herald                  Connect to Discord");
    println!("  herald --console        Drive the bot from the terminal");
    println!("  herald --config <path>  Read configuration from <path>");
    println!("  herald --help           Show this help message");
    println!("  herald --version        Show version");
    println!();
    println!("Configuration is read from ./herald.toml when present.");
    println!();
    println!("Environment Variables:");
    println!("  DISCORD_BOT_TOKEN     Discord bot token (required for Discord mode)");
    println!("  HERALD_PREFIX         Command prefix (default: !)");
    println!("  HERALD_ALLOW_MENTION  Accept @mention as prefix (default: true)");
    println!("  HERALD_IGNORE_BOTS    Ignore messages from bots (default: true)");
    println!("  HERALD_COMMANDS_DIR   Directory of command manifests");
    println!("  HERALD_EXCLUDE        Regex of file names to skip (default: ^[._])");
    println!("  HERALD_OWNER_IDS      Comma-separated owner user ids");
    println!("  RUST_LOG              Log filter (default: info)");
}

/// Register built-in commands and the command directory, and start the
/// event logger before anything is registered so every load is logged
async fn prepare(client: &Client, config: &HeraldConfig) -> anyhow::Result<JoinHandle<()>> {
    let logger = events::spawn_event_logger(client.subscribe());

    register_builtins(client).await?;

    if let Some(dir) = &config.commands_dir {
        let report = client
            .load_directory(dir)
            .await
            .with_context(|| format!("Failed to read commands directory {}", dir.display()))?;
        tracing::info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            dir = %dir.display(),
            "Loaded command files"
        );
    }

    tracing::info!(commands = client.registry().len().await, "Commands ready");
    Ok(logger)
}

/// Run against Discord until Ctrl+C or the connection ends
async fn run_discord(config: HeraldConfig) -> anyhow::Result<()> {
    let bot = HeraldBot::new(&config)?;
    let logger = prepare(bot.client(), &config).await?;

    tracing::info!("Press Ctrl+C to exit");

    tokio::select! {
        result = bot.start() => {
            if let Err(e) = result {
                logger.abort();
                return Err(e).context("Discord bot error");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutting down...");
        }
    }

    logger.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Run the interactive console
async fn run_console(config: HeraldConfig) -> anyhow::Result<()> {
    let client = Client::builder(Arc::new(ConsoleTransport::stdout()))
        .options(config.client.clone())
        .loader(Arc::new(ManifestLoader::new(handler_table())))
        .build()?;

    let logger = prepare(&client, &config).await?;
    client.on_ready().await?;

    let result = console::run_console(client).await;
    logger.abort();
    result
}
