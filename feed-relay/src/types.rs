use std::path::PathBuf;

pub use interfaces::defs::{FeedItem, LocalMediaFile, NotificationMessage};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Feed-Relay/1.0".to_string(),
            timeout_seconds: 5,
            max_redirects: 3,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed fetch failed for {url}: {reason}")]
    FeedFetch { url: String, reason: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Media fetch failed for {id}: {reason}")]
    MediaFetch { id: String, reason: String },

    #[error("Upload failed for {path:?}: {reason}")]
    UploadFailed { path: PathBuf, reason: String },

    #[error("Mail dispatch failed: {0:#}")]
    MailDispatch(anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Stable error code used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Http(_) | Self::FeedFetch { .. } | Self::Parse(_) => "FEED_FETCH_ERROR",
            Self::MediaFetch { .. } => "MEDIA_FETCH_ERROR",
            Self::UploadFailed { .. } => "UPLOAD_FAILED",
            Self::MailDispatch(_) => "MAIL_DISPATCH_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
