use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the text generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// OpenAI-compatible chat completions endpoint
    pub api_url: String,

    /// API key. When unset, read from the `api_key_env` variable.
    pub api_key: Option<String>,

    /// Environment variable holding the API key (default: OPENAI_API_KEY)
    pub api_key_env: String,

    /// Model used for article summaries
    pub summary_model: String,

    /// Model used for snapshot highlights
    pub highlight_model: String,

    /// Content is cut to this many characters before sending (default: 15000)
    pub max_content_chars: usize,

    /// Request timeout in seconds (default: 60)
    pub timeout_secs: u64,

    pub temperature: f32,

    pub summary_max_tokens: u32,

    pub highlight_max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            summary_model: "gpt-4o".to_string(),
            highlight_model: "gpt-4o-mini".to_string(),
            max_content_chars: 15_000,
            timeout_secs: 60,
            temperature: 0.7,
            summary_max_tokens: 400,
            highlight_max_tokens: 150,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The configured key, falling back to the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = GeneratorConfig::default();
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.max_content_chars, 15_000);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_explicit_key_wins() {
        let config = GeneratorConfig {
            api_key: Some(" sk-test ".into()),
            api_key_env: "LOWDOWN_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_blank_key_falls_back_to_missing_env() {
        let config = GeneratorConfig {
            api_key: Some("   ".into()),
            api_key_env: "LOWDOWN_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        assert!(config.resolve_api_key().is_none());
    }
}
