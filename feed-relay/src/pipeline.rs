use crate::filter::TimeWindowFilter;
use crate::notification::compose_message;
use crate::traits::{FeedSource, FileLocator, MediaFetcher, Relay};
use crate::types::{FeedItem, LocalMediaFile, PipelineError, Result};
use chrono::{DateTime, Utc};
use interfaces::defs::Notifier;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// What the orchestrator does when an item fails outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemErrorPolicy {
    /// Stop the run at the first failed item.
    #[default]
    Abort,
    /// Record the failure and move on to the next item.
    Continue,
}

impl std::str::FromStr for ItemErrorPolicy {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "continue" => Ok(Self::Continue),
            other => Err(PipelineError::Config(format!(
                "unknown item error policy '{}', expected abort or continue",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoLocalFiles,
    NoUploadResults,
}

#[derive(Debug)]
pub enum ItemOutcome {
    Notified { message_id: String, links: Vec<String> },
    Skipped(SkipReason),
    Failed(PipelineError),
}

#[derive(Debug)]
pub struct ItemReport {
    pub item_id: String,
    pub title: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub polled: usize,
    pub eligible: usize,
    pub items: Vec<ItemReport>,
}

impl RunReport {
    pub fn notified(&self) -> usize {
        self.items
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Notified { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.items
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Failed(_)))
            .count()
    }
}

/// Drives one poll cycle: feed -> window filter -> per item
/// (download -> locate -> concurrent upload -> notify).
pub struct RelayPipeline {
    source: Box<dyn FeedSource>,
    filter: TimeWindowFilter,
    fetcher: Arc<dyn MediaFetcher>,
    locator: Arc<dyn FileLocator>,
    relay: Arc<dyn Relay>,
    notifier: Arc<dyn Notifier>,
    policy: ItemErrorPolicy,
}

impl RelayPipeline {
    pub fn new(
        source: Box<dyn FeedSource>,
        fetcher: Arc<dyn MediaFetcher>,
        locator: Arc<dyn FileLocator>,
        relay: Arc<dyn Relay>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            filter: TimeWindowFilter::default(),
            fetcher,
            locator,
            relay,
            notifier,
            policy: ItemErrorPolicy::default(),
        }
    }

    pub fn with_filter(mut self, filter: TimeWindowFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_policy(mut self, policy: ItemErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.run_at(Utc::now()).await
    }

    /// Run one poll cycle with `now` as the reference time of the window.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let span = info_span!("run", run_id = %Uuid::new_v4());
        self.run_inner(now).instrument(span).await
    }

    async fn run_inner(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let items = self.source.poll().await.inspect_err(|e| {
            error!(code = e.code(), "Polling {} failed: {}", self.source.source_name(), e);
        })?;
        let polled = items.len();

        let eligible = self.filter.apply_at(items, now);
        info!(
            "{} of {} items published within the last {}h",
            eligible.len(),
            polled,
            self.filter.lookback().num_hours()
        );

        let mut report = RunReport {
            polled,
            eligible: eligible.len(),
            items: Vec::with_capacity(eligible.len()),
        };

        // The feed lists newest first; handle the oldest upload first.
        for item in eligible.iter().rev() {
            let outcome = self
                .process_item(item)
                .instrument(info_span!("item", id = %item.id))
                .await;

            let outcome = match outcome {
                ItemOutcome::Failed(e) => {
                    error!(code = e.code(), "Item {} failed: {}", item.id, e);
                    if self.policy == ItemErrorPolicy::Abort {
                        return Err(e);
                    }
                    ItemOutcome::Failed(e)
                }
                other => other,
            };

            report.items.push(ItemReport {
                item_id: item.id.clone(),
                title: item.title.clone(),
                outcome,
            });
        }

        info!(
            "Run finished: {} notified, {} skipped, {} failed",
            report.notified(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    /// Download, locate, upload and notify for a single item.
    pub async fn process_item(&self, item: &FeedItem) -> ItemOutcome {
        info!("Processing '{}' by {}", item.title, item.author);

        if let Err(e) = self.fetcher.fetch(&item.id).await {
            return ItemOutcome::Failed(e);
        }

        let files = match self.locator.locate(&item.id).await {
            Ok(files) => files,
            Err(e) => return ItemOutcome::Failed(e),
        };
        if files.is_empty() {
            info!("No local files for {}, skipping", item.id);
            return ItemOutcome::Skipped(SkipReason::NoLocalFiles);
        }

        let links = self.relay_all(&files).await;
        if links.is_empty() {
            warn!("No upload produced a link for {}, skipping", item.id);
            return ItemOutcome::Skipped(SkipReason::NoUploadResults);
        }

        let message = compose_message(item, &links);
        match self.notifier.notify(&message).await {
            Ok(message_id) => {
                info!("Notified subscribers about {} ({})", item.id, message_id);
                ItemOutcome::Notified { message_id, links }
            }
            Err(e) => ItemOutcome::Failed(PipelineError::MailDispatch(e)),
        }
    }

    /// Upload every file concurrently. Links keep the order of `files`;
    /// failed uploads are logged and left out.
    async fn relay_all(&self, files: &[LocalMediaFile]) -> Vec<String> {
        let results =
            futures::future::join_all(files.iter().map(|file| self.relay.relay(file))).await;

        files
            .iter()
            .zip(results)
            .filter_map(|(file, result)| match result {
                Ok(link) => Some(link),
                Err(e) => {
                    warn!(code = e.code(), "Upload of {} failed: {}", file.file_name(), e);
                    None
                }
            })
            .collect()
    }
}
