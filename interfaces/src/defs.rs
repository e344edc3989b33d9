use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// One entry of the monitored feed, normalized by the feed source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Video identifier with the feed namespace prefix already stripped.
    pub id: String,
    pub title: String,
    pub author: String,
    /// `None` when the feed carried no timestamp or one that failed to parse.
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedItem {
    pub fn watch_url(&self) -> String {
        watch_url_for(&self.id)
    }
}

pub fn watch_url_for(id: &str) -> String {
    format!("{}{}", WATCH_URL_BASE, id)
}

/// A file materialized on local storage for a feed item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalMediaFile {
    pub path: PathBuf,
}

impl LocalMediaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
}

// Object style note:
// A notifier is handed a fully composed message and either reports the
// transport's message identifier or fails. It never retries on its own;
// the caller decides whether a failure ends the run.

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &NotificationMessage) -> anyhow::Result<String>;
}
