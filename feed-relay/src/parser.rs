use crate::types::{FeedItem, PipelineError, Result};
use chrono::Utc;
use feed_rs::parser;
use tracing::{debug, info};

/// Namespace prefix YouTube puts in front of every video id.
pub const VIDEO_ID_PREFIX: &str = "yt:video:";

/// Parse an Atom/RSS document into feed items, keeping feed order.
pub fn parse_feed(content: &[u8]) -> Result<Vec<FeedItem>> {
    debug!("Parsing feed content ({} bytes)", content.len());

    let feed = parser::parse(content)
        .map_err(|e| PipelineError::Parse(format!("Failed to parse feed: {}", e)))?;

    let items: Vec<FeedItem> = feed.entries.into_iter().filter_map(parse_entry).collect();

    info!("Parsed feed with {} entries", items.len());
    Ok(items)
}

fn parse_entry(entry: feed_rs::model::Entry) -> Option<FeedItem> {
    let id = strip_id_prefix(&entry.id);
    if id.is_empty() {
        debug!("Skipping entry without an id");
        return None;
    }

    let title = entry.title.map(|t| t.content).unwrap_or_default();
    let author = entry
        .authors
        .first()
        .map(|a| a.name.clone())
        .unwrap_or_default();

    // feed-rs leaves a date empty when the source value cannot be parsed.
    // Entries without a publish date fall back to their update date.
    let published_at = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.with_timezone(&Utc));

    Some(FeedItem {
        id,
        title,
        author,
        published_at,
    })
}

pub fn strip_id_prefix(raw: &str) -> String {
    raw.trim()
        .strip_prefix(VIDEO_ID_PREFIX)
        .unwrap_or(raw.trim())
        .to_string()
}
