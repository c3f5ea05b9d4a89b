//! Subcommand implementations and the wiring they share.

pub mod bot;
pub mod chat;
pub mod config_cmd;
pub mod tools;

use std::path::Path;
use std::sync::Arc;
use sysbot_agent::AgentRunner;
use sysbot_config::AppConfig;
use sysbot_core::tool::ToolRegistry;
use sysbot_tools::ToolOptions;

/// Load configuration from `path` (or the default location), apply
/// environment overrides and validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        None => AppConfig::load(),
        Some(path) => AppConfig::load_from(path).and_then(|mut config| {
            config.apply_env(|key| std::env::var(key).ok());
            config.validate().map(|_| config)
        }),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

/// The tool registry described by `config`.
pub fn build_tools(config: &AppConfig) -> Arc<ToolRegistry> {
    Arc::new(sysbot_tools::default_registry(&ToolOptions {
        command_timeout_secs: config.tools.command_timeout_secs,
        encryption_passphrase: config.tools.encryption_passphrase.clone(),
    }))
}

/// Provider, tools and descriptor assembled into a runner.
pub fn build_runner(config: &AppConfig) -> Result<AgentRunner, Box<dyn std::error::Error>> {
    let provider = sysbot_providers::build_from_config(config)?;
    let runner = AgentRunner::from_config(config, provider, build_tools(config))?;
    Ok(runner)
}
