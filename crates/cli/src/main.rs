//! SysBot CLI — the main entry point.
//!
//! Commands:
//! - `bot`    — Run the Telegram bot (long polling)
//! - `chat`   — Talk to the agent from the terminal
//! - `tools`  — List the built-in tools
//! - `call`   — Invoke one tool directly
//! - `config` — Show the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "sysbot",
    about = "SysBot — control your machine from a chat through an LLM agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.sysbot/config.toml
    #[arg(short, long, global = true, env = "SYSBOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot
    Bot,

    /// Chat with the agent in the terminal
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List the built-in tools
    Tools {
        /// Print full JSON schemas
        #[arg(long)]
        schema: bool,
    },

    /// Invoke a tool directly and print its outcome
    Call {
        /// Tool name, e.g. get_file_info
        tool: String,

        /// JSON arguments, e.g. '{"path": "Cargo.toml"}'
        #[arg(default_value = "{}")]
        args: String,
    },

    /// Show the effective configuration
    Config {
        /// Print the default configuration instead
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Bot => commands::bot::run(config_path).await?,
        Commands::Chat { message } => commands::chat::run(config_path, message).await?,
        Commands::Tools { schema } => commands::tools::list(config_path, schema)?,
        Commands::Call { tool, args } => commands::tools::call(config_path, &tool, &args).await?,
        Commands::Config { default } => commands::config_cmd::show(config_path, default)?,
    }

    Ok(())
}
