//! Content acquisition: fetch a URL and reduce it to readable text.
//!
//! # Architecture
//!
//! ```text
//! Item (url) → Acquirer → HTML → ContentExtractor → plain text → Generator
//! ```
//!
//! Two backends implement [`Acquirer`]: a plain HTTP client and a headless
//! Chrome for pages that need JavaScript. Pick one with
//! [`ScraperConfig::backend`] and build it with [`build_acquirer`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use lowdown::scraper::{build_acquirer, ScraperConfig};
//!
//! let acquirer = build_acquirer(&ScraperConfig::default()).await?;
//! let text = acquirer.acquire("https://example.com/article").await?;
//! ```

mod chrome;
mod config;
mod extractor;
mod http;

pub use chrome::ChromeScraper;
pub use config::{ScraperBackend, ScraperConfig};
pub use extractor::ContentExtractor;
pub use http::HttpScraper;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::{LowdownError, Result};

/// Fetches a page and returns its readable text.
#[async_trait]
pub trait Acquirer: Send + Sync {
    /// Acquire the text behind `url`.
    ///
    /// A page that yields no text after extraction is
    /// [`LowdownError::NoContent`], distinct from transport failures.
    async fn acquire(&self, url: &str) -> Result<String>;
}

/// Build the configured backend.
pub async fn build_acquirer(config: &ScraperConfig) -> Result<Arc<dyn Acquirer>> {
    match config.backend {
        ScraperBackend::Http => Ok(Arc::new(HttpScraper::new(config.clone())?)),
        ScraperBackend::Chrome => Ok(Arc::new(ChromeScraper::new(config.clone()).await?)),
    }
}

/// Shared tail of every backend: empty text means there was nothing to read.
pub(crate) fn non_empty(text: String) -> Result<String> {
    if text.trim().is_empty() {
        Err(LowdownError::NoContent)
    } else {
        Ok(text)
    }
}
