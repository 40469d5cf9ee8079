use crate::config::Config;
use crate::providers::openai::{OPENAI_BASE_URL, OpenAIProvider};
use crate::traits::Provider;
use anyhow::{Result, anyhow};

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

pub const PROVIDERS: &[&str] = &["openai", "openrouter", "ollama"];

pub fn create_provider(config: &Config) -> Result<Box<dyn Provider>> {
    let provider_name = config.provider.as_deref().unwrap_or("openai");

    let (api_key, default_base_url) = match provider_name.to_lowercase().as_str() {
        "ollama" => (String::new(), OLLAMA_BASE_URL),
        "openai" => (
            resolve_api_key_with_fallback(
                &["OPENAI_API_KEY", "TALLY_OPENAI_API_KEY"],
                &config.api_key,
            )?,
            OPENAI_BASE_URL,
        ),
        "openrouter" => (
            resolve_api_key_with_fallback(
                &["OPENROUTER_API_KEY", "TALLY_OPENROUTER_API_KEY"],
                &config.api_key,
            )?,
            OPENROUTER_BASE_URL,
        ),
        _ => {
            return Err(anyhow!(
                "Unknown provider: {}. Available: {}",
                provider_name,
                PROVIDERS.join(", ")
            ));
        }
    };

    let provider = OpenAIProvider::new(api_key)
        .with_model(config.model.clone())
        .with_base_url(config.base_url.as_deref().unwrap_or(default_base_url));
    Ok(Box::new(provider))
}

fn resolve_api_key_with_fallback(env_vars: &[&str], config_key: &str) -> Result<String> {
    for var_name in env_vars {
        if let Ok(key) = std::env::var(var_name)
            && !key.trim().is_empty()
        {
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(anyhow!(
            "No API key found. Set {} or run 'tally onboard'.",
            env_vars.join(" / ")
        ))
    }
}
