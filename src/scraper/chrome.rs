use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::app::{LowdownError, Result};
use crate::scraper::config::ScraperConfig;
use crate::scraper::extractor::ContentExtractor;
use crate::scraper::{non_empty, Acquirer};

/// Chrome-based acquisition using chromiumoxide
pub struct ChromeScraper {
    browser: Arc<Browser>,
    config: ScraperConfig,
    extractor: ContentExtractor,
    semaphore: Arc<Semaphore>,
}

impl ChromeScraper {
    /// Launch a browser with the given configuration
    pub async fn new(config: ScraperConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .request_timeout(config.timeout());

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| LowdownError::Scraper(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            LowdownError::Scraper(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        let extractor = ContentExtractor::new(&config);

        Ok(Self {
            browser: Arc::new(browser),
            config,
            extractor,
            semaphore,
        })
    }

    /// Load `url` in a fresh tab and return its HTML. The tab is closed on
    /// every exit path, including the load timeout.
    async fn page_html(&self, url: &str) -> Result<String> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| LowdownError::Scraper(format!("Failed to create page: {}", e)))?;

        let html = match tokio::time::timeout(self.config.timeout(), self.load(&page, url)).await {
            Ok(result) => result,
            Err(_) => Err(LowdownError::Scraper(format!(
                "Timed out after {}s loading {}",
                self.config.timeout_secs, url
            ))),
        };

        if let Err(e) = page.close().await {
            debug!("Failed to close page for {}: {}", url, e);
        }
        html
    }

    async fn load(&self, page: &Page, url: &str) -> Result<String> {
        page.set_user_agent(self.config.user_agent.as_str())
            .await
            .map_err(|e| LowdownError::Scraper(format!("Failed to set user agent: {}", e)))?;

        page.goto(url)
            .await
            .map_err(|e| LowdownError::Scraper(format!("Navigation failed: {}", e)))?;

        tokio::time::sleep(self.config.wait_after_load()).await;

        page.content()
            .await
            .map_err(|e| LowdownError::Scraper(format!("Failed to read page: {}", e)))
    }
}

#[async_trait]
impl Acquirer for ChromeScraper {
    async fn acquire(&self, url: &str) -> Result<String> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| LowdownError::Scraper(format!("Semaphore error: {}", e)))?;

        let html = self.page_html(url).await?;
        debug!("Rendered {} bytes from {}", html.len(), url);

        non_empty(self.extractor.extract(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::ScraperBackend;

    #[tokio::test]
    #[ignore = "needs Chrome or Chromium in PATH"]
    async fn test_failed_loads_leave_no_open_tabs() {
        let scraper = ChromeScraper::new(ScraperConfig {
            backend: ScraperBackend::Chrome,
            timeout_secs: 1,
            wait_after_load_ms: 0,
            ..Default::default()
        })
        .await
        .unwrap();
        let before = scraper.browser.pages().await.unwrap().len();

        let _ = scraper.acquire("http://127.0.0.1:9/").await;
        let _ = scraper.acquire("not a url").await;

        assert_eq!(scraper.browser.pages().await.unwrap().len(), before);
    }
}
