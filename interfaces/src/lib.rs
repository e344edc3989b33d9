pub mod defs;

pub use defs::{FeedItem, LocalMediaFile, NotificationMessage, Notifier, watch_url_for};
