use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which engine fetches pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScraperBackend {
    /// Plain HTTP GET, no JavaScript.
    #[default]
    Http,
    /// Headless Chrome via chromiumoxide, for script-rendered pages.
    Chrome,
}

/// Configuration for content acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Fetch engine (default: http)
    pub backend: ScraperBackend,

    /// Request / page load timeout in seconds (default: 15)
    pub timeout_secs: u64,

    /// User agent string to send
    pub user_agent: String,

    /// Lines of extracted text this short or shorter are dropped (default: 25)
    pub min_line_length: usize,

    /// CSS selectors tried in order to find the main content container
    pub content_selectors: Vec<String>,

    /// CSS selectors for elements whose text is discarded
    pub remove_selectors: Vec<String>,

    /// Whether Chrome runs headless (default: true)
    pub headless: bool,

    /// Wait after page load for dynamic content, Chrome only (default: 1000)
    pub wait_after_load_ms: u64,

    /// Maximum concurrent Chrome pages (default: 5)
    pub max_concurrency: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            backend: ScraperBackend::Http,
            timeout_secs: 15,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            min_line_length: 25,
            content_selectors: vec![
                "article".to_string(),
                "main".to_string(),
                "body".to_string(),
            ],
            remove_selectors: vec![
                "script".to_string(),
                "style".to_string(),
                "header".to_string(),
                "footer".to_string(),
                "nav".to_string(),
                "aside".to_string(),
                "form".to_string(),
                "button".to_string(),
            ],
            headless: true,
            wait_after_load_ms: 1000,
            max_concurrency: 5,
        }
    }
}

impl ScraperConfig {
    /// Get the request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the wait time after load as a Duration
    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = ScraperConfig::default();
        assert_eq!(config.backend, ScraperBackend::Http);
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.min_line_length, 25);
        assert_eq!(config.content_selectors, vec!["article", "main", "body"]);
        assert!(config.remove_selectors.iter().any(|s| s == "nav"));
        assert!(config.headless);
    }

    #[test]
    fn test_durations() {
        let config = ScraperConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert_eq!(config.wait_after_load(), Duration::from_millis(1000));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ScraperConfig = toml::from_str("backend = \"chrome\"\ntimeout_secs = 40").unwrap();
        assert_eq!(config.backend, ScraperBackend::Chrome);
        assert_eq!(config.timeout_secs, 40);
        assert_eq!(config.min_line_length, 25);
    }
}
