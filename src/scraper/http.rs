use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::app::Result;
use crate::scraper::extractor::ContentExtractor;
use crate::scraper::{non_empty, Acquirer, ScraperConfig};

/// Plain HTTP acquisition. Follows redirects, fails on non-2xx.
pub struct HttpScraper {
    client: Client,
    extractor: ContentExtractor,
}

impl HttpScraper {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            extractor: ContentExtractor::new(&config),
        })
    }
}

#[async_trait]
impl Acquirer for HttpScraper {
    async fn acquire(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;

        let html = response.text().await?;
        debug!("Fetched {} bytes from {}", html.len(), url);

        non_empty(self.extractor.extract(&html))
    }
}
