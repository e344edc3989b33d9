use crate::types::FeedItem;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Keeps the feed items published within a recency window.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindowFilter {
    lookback: Duration,
}

impl Default for TimeWindowFilter {
    fn default() -> Self {
        Self::days(1)
    }
}

impl TimeWindowFilter {
    pub fn new(lookback: Duration) -> Self {
        Self { lookback }
    }

    /// Out-of-range day counts saturate to the widest representable window.
    pub fn days(days: i64) -> Self {
        Self::new(Duration::try_days(days).unwrap_or(Duration::MAX))
    }

    pub fn lookback(&self) -> Duration {
        self.lookback
    }

    /// Filter against the current wall-clock time.
    pub fn apply(&self, items: Vec<FeedItem>) -> Vec<FeedItem> {
        self.apply_at(items, Utc::now())
    }

    /// Items published strictly after `now - lookback`, in their original order.
    /// Items without a timestamp never qualify. A window reaching past the
    /// earliest representable time keeps every dated item.
    pub fn apply_at(&self, items: Vec<FeedItem>, now: DateTime<Utc>) -> Vec<FeedItem> {
        let threshold = now.checked_sub_signed(self.lookback);

        items
            .into_iter()
            .filter(|item| match item.published_at {
                Some(published) => threshold.map_or(true, |threshold| published > threshold),
                None => {
                    debug!("Excluding {} ({}): no usable publish time", item.id, item.title);
                    false
                }
            })
            .collect()
    }
}
