use crate::types::{FeedItem, LocalMediaFile, Result};
use async_trait::async_trait;

/// Trait for pulling the current entries of a content feed
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Fetch and normalize every entry the feed currently lists, in feed order
    async fn poll(&self) -> Result<Vec<FeedItem>>;
}

/// Materializes the media belonging to a feed item on local storage
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, item_id: &str) -> Result<()>;
}

/// Enumerates the local files that were materialized for a feed item
#[async_trait]
pub trait FileLocator: Send + Sync {
    async fn locate(&self, item_id: &str) -> Result<Vec<LocalMediaFile>>;
}

/// Hands a local file to an external hosting service and returns its public link
#[async_trait]
pub trait Relay: Send + Sync {
    async fn relay(&self, file: &LocalMediaFile) -> Result<String>;
}
