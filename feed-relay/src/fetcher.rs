use crate::types::{FetchConfig, PipelineError, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Download the raw feed document. A single attempt, bounded by the client timeout.
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<u8>> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            PipelineError::FeedFetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::FeedFetch {
                url: url.to_string(),
                reason: format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        let content = response.bytes().await?;
        info!(
            "Successfully fetched feed: {} ({} bytes in {}ms)",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );

        Ok(content.to_vec())
    }
}
