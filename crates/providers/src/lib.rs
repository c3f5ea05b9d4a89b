//! LLM provider implementations for SysBot.
//!
//! All providers implement the `sysbot_core::Provider` trait. Gemini, OpenAI,
//! OpenRouter and Ollama are all reached through their OpenAI-compatible
//! chat completions endpoint.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use std::sync::Arc;
use sysbot_config::AppConfig;
use sysbot_core::error::ProviderError;
use sysbot_core::provider::Provider;

/// Providers that run locally and need no API key.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "vllm", "llamacpp"];

/// Build the configured provider.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.clone().unwrap_or_default();
    if api_key.is_empty() && !KEYLESS_PROVIDERS.contains(&config.provider.as_str()) {
        return Err(ProviderError::NotConfigured(format!(
            "No API key for provider '{}'. Set GEMINI_API_KEY (or SYSBOT_API_KEY) or api_key in the config file.",
            config.provider
        )));
    }

    Ok(Arc::new(OpenAiCompatProvider::new(
        &config.provider,
        &config.api_url,
        api_key,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_not_configured() {
        let config = AppConfig::default();
        assert!(matches!(
            build_from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn builds_with_key() {
        let config = AppConfig {
            api_key: Some("key".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn local_provider_needs_no_key() {
        let config = AppConfig {
            provider: "ollama".into(),
            api_url: "http://localhost:11434/v1".into(),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_ok());
    }
}
