//! `sysbot config` — Print the effective configuration.

use std::path::Path;
use sysbot_config::AppConfig;

const REDACTED: &str = "[REDACTED]";

/// The config as TOML, with secrets masked.
pub fn redacted_toml(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some(REDACTED.into());
    }
    if shown.telegram.bot_token.is_some() {
        shown.telegram.bot_token = Some(REDACTED.into());
    }
    if shown.tools.encryption_passphrase.is_some() {
        shown.tools.encryption_passphrase = Some(REDACTED.into());
    }
    toml::to_string_pretty(&shown)
}

pub fn show(config_path: Option<&Path>, default: bool) -> Result<(), Box<dyn std::error::Error>> {
    if default {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = super::load_config(config_path)?;
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    println!("# Source: {} (plus environment overrides)", path.display());

    let mut warnings = Vec::new();
    if config.api_key.is_none() {
        warnings.push("No API key set (GEMINI_API_KEY or SYSBOT_API_KEY)");
    }
    if config.telegram.bot_token.is_none() {
        warnings.push("No bot token set (BOT_TOKEN), `sysbot bot` will not start");
    }
    if config.telegram.allowed_chat_ids.is_empty() {
        warnings.push("Allow-list is empty, every chat will be rejected");
    }
    for w in &warnings {
        println!("# ⚠️  {w}");
    }
    println!();
    print!("{}", redacted_toml(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-live".into());
        config.telegram.bot_token = Some("123:abc".into());
        let out = redacted_toml(&config).unwrap();
        assert!(!out.contains("sk-live"));
        assert!(!out.contains("123:abc"));
        assert!(out.contains(REDACTED));
        assert!(!out.contains("encryption_passphrase"));
    }
}
