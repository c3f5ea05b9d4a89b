//! `sysbot bot` — Run the Telegram front end until Ctrl+C.

use std::path::Path;
use std::sync::Arc;
use sysbot_agent::SessionStore;
use sysbot_channels::{TelegramChannel, TelegramConfig};
use sysbot_core::channel::Channel;
use sysbot_frontend::{Dispatcher, FrontendOptions};
use sysbot_security::ChatAllowlist;
use tracing::{info, warn};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    let telegram = TelegramConfig::from_settings(&config.telegram)?;
    let runner = super::build_runner(&config)?;
    let allowlist = ChatAllowlist::from_entries(&config.telegram.allowed_chat_ids);
    let workspace = config.workspace_dir();

    println!("🤖 SysBot starting");
    println!("   Agent:     {}", runner.descriptor().name);
    println!("   Model:     {}", config.model);
    println!("   Tools:     {}", runner.descriptor().tool_names.len());
    println!("   Workspace: {}", workspace.display());
    if allowlist.is_wildcard() {
        println!("   Chats:     all (wildcard)");
    } else {
        println!("   Chats:     {}", allowlist.members().count());
    }

    let channel = Arc::new(TelegramChannel::new(telegram));
    match channel.health_check().await {
        Ok(true) => {}
        Ok(false) => return Err("Telegram rejected the bot token".into()),
        Err(e) => warn!(error = %e, "Telegram health check failed, polling anyway"),
    }

    let dispatcher = Dispatcher::new(
        channel,
        Arc::new(runner),
        Arc::new(SessionStore::new(workspace)),
        allowlist,
    )
    .with_options(FrontendOptions::from_config(&config));

    dispatcher.startup().await;
    info!("Bot is polling, press Ctrl+C to stop");

    dispatcher
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    println!("👋 SysBot stopped");
    Ok(())
}
