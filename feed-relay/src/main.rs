use email_notifier::SmtpNotifier;
use feed_relay::{
    CommandRelay, Config, DirectoryLocator, RelayPipeline, TimeWindowFilter, YoutubeFeedSource,
    YtDlpFetcher,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().inspect_err(|e| error!("{}", e))?;

    info!("Starting feed relay for channel {}", config.channel_id);
    info!("Mail settings: {:?}", config.mail);

    let source = YoutubeFeedSource::new(config.channel_id.clone(), config.fetch.clone())?;
    let fetcher = YtDlpFetcher::new(
        config.ytdlp_bin.clone(),
        config.media_dir.clone(),
        config.subtitle_lang.clone(),
    );
    let locator = DirectoryLocator::new(config.media_dir.clone());
    let relay = CommandRelay::from_command_line(&config.uploader_cmd)?;
    let notifier = SmtpNotifier::new(config.mail.clone())?;

    let pipeline = RelayPipeline::new(
        Box::new(source),
        Arc::new(fetcher),
        Arc::new(locator),
        Arc::new(relay),
        Arc::new(notifier),
    )
    .with_filter(TimeWindowFilter::days(config.lookback_days))
    .with_policy(config.item_error_policy);

    let report = pipeline.run().await?;

    info!(
        "Feed relay finished: {} polled, {} eligible, {} notified",
        report.polled,
        report.eligible,
        report.notified()
    );
    Ok(())
}
