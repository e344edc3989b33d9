use crate::parser;
use crate::traits::FeedSource;
use crate::types::{FeedItem, FetchConfig, Result};
use crate::Fetcher;
use async_trait::async_trait;
use tracing::info;

const CHANNEL_FEED_BASE: &str = "https://www.youtube.com/feeds/videos.xml?channel_id=";

/// Upload feed of a single YouTube channel
pub struct YoutubeFeedSource {
    pub channel_id: String,
    pub url: String,
    fetcher: Fetcher,
}

impl YoutubeFeedSource {
    pub fn new(channel_id: impl Into<String>, fetch_config: FetchConfig) -> Result<Self> {
        let channel_id = channel_id.into();
        let url = channel_feed_url(&channel_id);
        Ok(Self {
            channel_id,
            url,
            fetcher: Fetcher::new(fetch_config)?,
        })
    }
}

pub fn channel_feed_url(channel_id: &str) -> String {
    format!("{}{}", CHANNEL_FEED_BASE, channel_id)
}

#[async_trait]
impl FeedSource for YoutubeFeedSource {
    fn source_name(&self) -> String {
        format!("YouTube channel {}", self.channel_id)
    }

    async fn poll(&self) -> Result<Vec<FeedItem>> {
        info!("Polling feed: {}", self.url);

        let content = self.fetcher.fetch_feed(&self.url).await?;
        let items = parser::parse_feed(&content)?;

        info!("Pulled {} items from {}", items.len(), self.source_name());
        Ok(items)
    }
}
