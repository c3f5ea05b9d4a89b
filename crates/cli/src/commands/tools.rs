//! `sysbot tools` and `sysbot call` — Inspect and invoke tools without a model.

use std::path::Path;
use sysbot_core::context::ToolContext;
use sysbot_core::tool::ToolCall;

pub fn list(config_path: Option<&Path>, schema: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let registry = super::build_tools(&config);

    println!("🔧 {} built-in tools", registry.len());
    println!();
    for def in registry.definitions() {
        if schema {
            println!("{}", serde_json::to_string_pretty(&def)?);
        } else {
            println!("  {:<24} {}", def.name, def.description);
        }
    }
    Ok(())
}

pub async fn call(
    config_path: Option<&Path>,
    tool: &str,
    args: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let registry = super::build_tools(&config);

    let arguments: serde_json::Value =
        serde_json::from_str(args).map_err(|e| format!("Arguments are not valid JSON: {e}"))?;
    let ctx = ToolContext::new(config.workspace_dir());
    let call = ToolCall {
        id: "cli".into(),
        name: tool.to_string(),
        arguments,
    };

    let outcome = registry.execute(&call, &ctx).await;
    println!("{}", serde_json::to_string_pretty(&outcome.to_json())?);
    Ok(())
}
