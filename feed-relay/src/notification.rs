use crate::types::{FeedItem, NotificationMessage};

/// Compose the summary mail for one item and the links of its relayed files.
pub fn compose_message(item: &FeedItem, links: &[String]) -> NotificationMessage {
    let published = item
        .published_at
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());

    let body = [
        format!("Title: {}", item.title),
        format!("Channel: {}", item.author),
        format!("Published: {}", published),
        format!("Link: {}", item.watch_url()),
        format!("Files:\n{}", links.join("\n")),
    ]
    .join("\n");

    NotificationMessage {
        subject: format!("YouTube update: {}", item.author),
        body,
    }
}
