//! HTTP page fetcher

use crate::{extract::extract_page, validate_url, PageScraper, ScrapedPage};
use async_trait::async_trait;
use linkstash_common::config::ScrapeConfig;
use linkstash_common::errors::{AppError, Result};
use linkstash_common::metrics;
use std::time::{Duration, Instant};

/// Fetches pages over HTTP and runs the selector-fallback extraction
pub struct HttpScraper {
    client: reqwest::Client,
    max_content_chars: usize,
}

impl HttpScraper {
    /// Create a scraper from configuration
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create scrape HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            max_content_chars: config.max_content_chars,
        })
    }
}

#[async_trait]
impl PageScraper for HttpScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage> {
        let parsed = validate_url(url)?;
        let domain = parsed.host_str().unwrap_or("unknown").to_string();
        let start = Instant::now();

        let result = self.fetch_and_extract(url, &parsed).await;

        metrics::record_scrape(start.elapsed().as_secs_f64(), &domain, result.is_ok());

        match &result {
            Ok(page) => tracing::debug!(
                url = %url,
                words = page.metrics.word_count,
                "Page scraped"
            ),
            Err(e) => tracing::warn!(url = %url, error = %e, "Scrape failed"),
        }

        result
    }
}

impl HttpScraper {
    async fn fetch_and_extract(&self, url: &str, parsed: &url::Url) -> Result<ScrapedPage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Extraction {
                url: url.to_string(),
                message: format!("request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Extraction {
                url: url.to_string(),
                message: format!("page returned status {}", response.status()),
            });
        }

        let body = response.text().await.map_err(|e| AppError::Extraction {
            url: url.to_string(),
            message: format!("failed to read body: {}", e),
        })?;

        extract_page(&body, parsed, self.max_content_chars)
    }
}
