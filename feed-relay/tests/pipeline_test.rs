use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use feed_relay::{
    FeedItem, FeedSource, FileLocator, ItemErrorPolicy, ItemOutcome, LocalMediaFile,
    MediaFetcher, PipelineError, Relay, RelayPipeline, Result, SkipReason, TimeWindowFilter,
};
use interfaces::defs::{NotificationMessage, Notifier};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

fn item(id: &str, age: Duration) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        title: format!("Video {}", id),
        author: "Some Channel".to_string(),
        published_at: Some(now() - age),
    }
}

struct FakeSource {
    items: Option<Vec<FeedItem>>,
}

#[async_trait]
impl FeedSource for FakeSource {
    fn source_name(&self) -> String {
        "fake".to_string()
    }

    async fn poll(&self) -> Result<Vec<FeedItem>> {
        self.items.clone().ok_or_else(|| PipelineError::FeedFetch {
            url: "http://feed.invalid".to_string(),
            reason: "timed out".to_string(),
        })
    }
}

#[derive(Default)]
struct RecordingFetcher {
    calls: Mutex<Vec<String>>,
    fail_for: Option<String>,
}

#[async_trait]
impl MediaFetcher for RecordingFetcher {
    async fn fetch(&self, item_id: &str) -> Result<()> {
        self.calls.lock().unwrap().push(item_id.to_string());
        if self.fail_for.as_deref() == Some(item_id) {
            return Err(PipelineError::MediaFetch {
                id: item_id.to_string(),
                reason: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct MapLocator {
    files: HashMap<String, Vec<LocalMediaFile>>,
}

impl MapLocator {
    fn with(mut self, id: &str, names: &[&str]) -> Self {
        let files = names
            .iter()
            .map(|name| LocalMediaFile::new(PathBuf::from("/staging").join(name)))
            .collect();
        self.files.insert(id.to_string(), files);
        self
    }
}

#[async_trait]
impl FileLocator for MapLocator {
    async fn locate(&self, item_id: &str) -> Result<Vec<LocalMediaFile>> {
        Ok(self.files.get(item_id).cloned().unwrap_or_default())
    }
}

/// Per file name: the link to return (or a failure) and how long the upload takes.
/// Also records the highest number of uploads running at the same time.
#[derive(Default)]
struct ScriptedRelay {
    uploads: HashMap<String, (Option<String>, u64)>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl ScriptedRelay {
    fn with(mut self, name: &str, link: Option<&str>, delay_ms: u64) -> Self {
        self.uploads
            .insert(name.to_string(), (link.map(str::to_string), delay_ms));
        self
    }
}

#[async_trait]
impl Relay for ScriptedRelay {
    async fn relay(&self, file: &LocalMediaFile) -> Result<String> {
        let (link, delay_ms) = self
            .uploads
            .get(&file.file_name())
            .cloned()
            .unwrap_or((None, 0));

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(StdDuration::from_millis(delay_ms)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        link.ok_or_else(|| PipelineError::UploadFailed {
            path: file.path().to_path_buf(),
            reason: "no public link in uploader output".to_string(),
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<NotificationMessage>>,
    fail: bool,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &NotificationMessage) -> anyhow::Result<String> {
        if self.fail {
            return Err(anyhow::anyhow!("535 authentication failed"));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("<{}@relay.test>", sent.len()))
    }
}

fn pipeline(
    items: Vec<FeedItem>,
    fetcher: Arc<RecordingFetcher>,
    locator: MapLocator,
    relay: ScriptedRelay,
    notifier: Arc<RecordingNotifier>,
) -> RelayPipeline {
    RelayPipeline::new(
        Box::new(FakeSource { items: Some(items) }),
        fetcher,
        Arc::new(locator),
        Arc::new(relay),
        notifier,
    )
    .with_filter(TimeWindowFilter::days(1))
}

#[tokio::test]
async fn only_recent_item_is_relayed_and_announced() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let report = pipeline(
        vec![item("new1", Duration::hours(2)), item("old1", Duration::days(3))],
        fetcher.clone(),
        MapLocator::default().with("new1", &["X.mp4"]),
        ScriptedRelay::default().with("X.mp4", Some("https://host.example/abc"), 0),
        notifier.clone(),
    )
    .run_at(now())
    .await
    .expect("run should succeed");

    assert_eq!(report.polled, 2);
    assert_eq!(report.eligible, 1);
    assert_eq!(report.notified(), 1);
    assert_eq!(*fetcher.calls.lock().unwrap(), vec!["new1"]);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("Some Channel"));
    assert!(sent[0].body.contains("https://host.example/abc"));
    assert!(sent[0].body.contains("https://www.youtube.com/watch?v=new1"));
    assert!(sent[0].body.contains("Title: Video new1"));
}

#[tokio::test]
async fn no_local_files_skips_without_notifying() {
    let notifier = Arc::new(RecordingNotifier::default());

    let report = pipeline(
        vec![item("new1", Duration::hours(1))],
        Arc::new(RecordingFetcher::default()),
        MapLocator::default(),
        ScriptedRelay::default(),
        notifier.clone(),
    )
    .run_at(now())
    .await
    .expect("run should succeed");

    assert!(notifier.sent().is_empty());
    assert!(matches!(
        report.items[0].outcome,
        ItemOutcome::Skipped(SkipReason::NoLocalFiles)
    ));
}

#[tokio::test]
async fn partial_upload_failure_still_notifies_with_successful_links() {
    let notifier = Arc::new(RecordingNotifier::default());

    let report = pipeline(
        vec![item("new1", Duration::hours(1))],
        Arc::new(RecordingFetcher::default()),
        MapLocator::default().with("new1", &["new1.mp4", "new1.zh.srt"]),
        ScriptedRelay::default()
            .with("new1.mp4", Some("https://files.example.cn/f/L1"), 0)
            .with("new1.zh.srt", None, 0),
        notifier.clone(),
    )
    .run_at(now())
    .await
    .expect("run should succeed");

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.ends_with("Files:\nhttps://files.example.cn/f/L1"));

    match &report.items[0].outcome {
        ItemOutcome::Notified { links, .. } => {
            assert_eq!(links, &vec!["https://files.example.cn/f/L1".to_string()])
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn all_uploads_failing_skips_notification() {
    let notifier = Arc::new(RecordingNotifier::default());

    let report = pipeline(
        vec![item("new1", Duration::hours(1))],
        Arc::new(RecordingFetcher::default()),
        MapLocator::default().with("new1", &["new1.mp4", "new1.zh.srt"]),
        ScriptedRelay::default(),
        notifier.clone(),
    )
    .run_at(now())
    .await
    .expect("run should succeed");

    assert!(notifier.sent().is_empty());
    assert!(matches!(
        report.items[0].outcome,
        ItemOutcome::Skipped(SkipReason::NoUploadResults)
    ));
}

#[tokio::test]
async fn links_keep_file_order_regardless_of_completion_order() {
    let notifier = Arc::new(RecordingNotifier::default());

    pipeline(
        vec![item("new1", Duration::hours(1))],
        Arc::new(RecordingFetcher::default()),
        MapLocator::default().with("new1", &["a.mp4", "b.srt"]),
        ScriptedRelay::default()
            .with("a.mp4", Some("https://files.example.cn/f/first"), 80)
            .with("b.srt", Some("https://files.example.cn/f/second"), 0),
        notifier.clone(),
    )
    .run_at(now())
    .await
    .expect("run should succeed");

    let body = &notifier.sent()[0].body;
    assert!(body.ends_with(
        "Files:\nhttps://files.example.cn/f/first\nhttps://files.example.cn/f/second"
    ));
}

#[tokio::test]
async fn uploads_for_one_item_run_concurrently() {
    let notifier = Arc::new(RecordingNotifier::default());
    let relay = ScriptedRelay::default()
        .with("c.mp4", Some("https://files.example.cn/f/c"), 50)
        .with("c.en.srt", Some("https://files.example.cn/f/en"), 50)
        .with("c.zh.srt", Some("https://files.example.cn/f/zh"), 50);
    let peak = relay.peak_in_flight.clone();

    let report = pipeline(
        vec![item("c", Duration::hours(1))],
        Arc::new(RecordingFetcher::default()),
        MapLocator::default().with("c", &["c.mp4", "c.en.srt", "c.zh.srt"]),
        relay,
        notifier.clone(),
    )
    .run_at(now())
    .await
    .expect("run should succeed");

    assert_eq!(report.notified(), 1);
    assert_eq!(peak.load(Ordering::SeqCst), 3);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn oldest_eligible_item_is_processed_first() {
    let fetcher = Arc::new(RecordingFetcher::default());

    pipeline(
        vec![item("newer", Duration::hours(1)), item("older", Duration::hours(5))],
        fetcher.clone(),
        MapLocator::default(),
        ScriptedRelay::default(),
        Arc::new(RecordingNotifier::default()),
    )
    .run_at(now())
    .await
    .expect("run should succeed");

    assert_eq!(*fetcher.calls.lock().unwrap(), vec!["older", "newer"]);
}

#[tokio::test]
async fn undated_item_is_never_processed() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut undated = item("undated", Duration::zero());
    undated.published_at = None;

    let report = pipeline(
        vec![undated],
        fetcher.clone(),
        MapLocator::default(),
        ScriptedRelay::default(),
        Arc::new(RecordingNotifier::default()),
    )
    .run_at(now())
    .await
    .expect("run should succeed");

    assert_eq!(report.eligible, 0);
    assert!(fetcher.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn media_fetch_failure_aborts_the_run_by_default() {
    let fetcher = Arc::new(RecordingFetcher {
        fail_for: Some("older".to_string()),
        ..Default::default()
    });
    let notifier = Arc::new(RecordingNotifier::default());

    let err = pipeline(
        vec![item("newer", Duration::hours(1)), item("older", Duration::hours(5))],
        fetcher.clone(),
        MapLocator::default().with("newer", &["newer.mp4"]),
        ScriptedRelay::default().with("newer.mp4", Some("https://files.example.cn/f/n"), 0),
        notifier.clone(),
    )
    .run_at(now())
    .await
    .unwrap_err();

    assert_eq!(err.code(), "MEDIA_FETCH_ERROR");
    assert_eq!(*fetcher.calls.lock().unwrap(), vec!["older"]);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn continue_policy_isolates_failed_items() {
    let fetcher = Arc::new(RecordingFetcher {
        fail_for: Some("older".to_string()),
        ..Default::default()
    });
    let notifier = Arc::new(RecordingNotifier::default());

    let report = pipeline(
        vec![item("newer", Duration::hours(1)), item("older", Duration::hours(5))],
        fetcher.clone(),
        MapLocator::default().with("newer", &["newer.mp4"]),
        ScriptedRelay::default().with("newer.mp4", Some("https://files.example.cn/f/n"), 0),
        notifier.clone(),
    )
    .with_policy(ItemErrorPolicy::Continue)
    .run_at(now())
    .await
    .expect("run should succeed");

    assert_eq!(report.failed(), 1);
    assert_eq!(report.notified(), 1);
    assert_eq!(report.items[0].item_id, "older");
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn mail_failure_aborts_the_run() {
    let notifier = Arc::new(RecordingNotifier {
        fail: true,
        ..Default::default()
    });

    let err = pipeline(
        vec![item("new1", Duration::hours(1))],
        Arc::new(RecordingFetcher::default()),
        MapLocator::default().with("new1", &["new1.mp4"]),
        ScriptedRelay::default().with("new1.mp4", Some("https://files.example.cn/f/n"), 0),
        notifier,
    )
    .run_at(now())
    .await
    .unwrap_err();

    assert_eq!(err.code(), "MAIL_DISPATCH_ERROR");
    assert!(err.to_string().contains("535"));
}

#[tokio::test]
async fn feed_failure_aborts_before_any_item() {
    let fetcher = Arc::new(RecordingFetcher::default());

    let err = RelayPipeline::new(
        Box::new(FakeSource { items: None }),
        fetcher.clone(),
        Arc::new(MapLocator::default()),
        Arc::new(ScriptedRelay::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .run()
    .await
    .unwrap_err();

    assert_eq!(err.code(), "FEED_FETCH_ERROR");
    assert!(fetcher.calls.lock().unwrap().is_empty());
}
