//! Configuration management for lowdown.
//!
//! Configuration is read from `~/.config/lowdown/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use crate::generator::GeneratorConfig;
use crate::pipeline::DEFAULT_WORKERS;
use crate::scraper::ScraperConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub scraper: ScraperConfig,
    pub generator: GeneratorConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. Defaults to `<data dir>/lowdown/lowdown.db`.
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Items processed concurrently by `process-pending`
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from `path`, writing the commented default there first if the
    /// file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/lowdown/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("lowdown").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# lowdown configuration

[store]
# Database file (default: <data dir>/lowdown/lowdown.db)
# db_path = "/path/to/lowdown.db"

[scraper]
# "http" for plain requests, "chrome" for pages that need JavaScript
backend = "http"

# Request / page load timeout in seconds
timeout_secs = 15

# Extracted lines this short or shorter are dropped
min_line_length = 25

# CSS selectors tried in order to find the main content
content_selectors = ["article", "main", "body"]

# Elements whose text is discarded
remove_selectors = [
    "script",
    "style",
    "header",
    "footer",
    "nav",
    "aside",
    "form",
    "button",
]

# Chrome backend only
headless = true
wait_after_load_ms = 1000
max_concurrency = 5

[generator]
# Any OpenAI-compatible chat completions endpoint
api_url = "https://api.openai.com/v1/chat/completions"

# The key is read from this environment variable unless api_key is set
api_key_env = "OPENAI_API_KEY"
# api_key = "sk-..."

summary_model = "gpt-4o"
highlight_model = "gpt-4o-mini"

# Content is truncated to this many characters before sending
max_content_chars = 15000

timeout_secs = 60
temperature = 0.7
summary_max_tokens = 400
highlight_max_tokens = 150

[batch]
# Items processed at once by process-pending
workers = 4
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
