//! Process configuration, read once from the environment at start-up.

use crate::pipeline::ItemErrorPolicy;
use crate::types::{FetchConfig, PipelineError, Result};
use email_notifier::MailConfig;
use std::path::PathBuf;
use std::str::FromStr;

/// Upper bound for `LOOKBACK_DAYS`, roughly ten years.
pub const MAX_LOOKBACK_DAYS: i64 = 3650;

#[derive(Debug, Clone)]
pub struct Config {
    pub channel_id: String,
    pub lookback_days: i64,
    pub media_dir: PathBuf,
    pub ytdlp_bin: String,
    pub subtitle_lang: String,
    pub uploader_cmd: String,
    pub item_error_policy: ItemErrorPolicy,
    pub fetch: FetchConfig,
    pub mail: MailConfig,
}

impl Config {
    /// Load `.env` when present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let channel_id = get("CHANNEL_ID")
            .ok_or_else(|| PipelineError::Config("CHANNEL_ID is not set".to_string()))?;

        let lookback_days: i64 = parse_var("LOOKBACK_DAYS", get("LOOKBACK_DAYS"), 1)?;
        if !(1..=MAX_LOOKBACK_DAYS).contains(&lookback_days) {
            return Err(PipelineError::Config(format!(
                "LOOKBACK_DAYS must be between 1 and {}, got {}",
                MAX_LOOKBACK_DAYS, lookback_days
            )));
        }

        let defaults = FetchConfig::default();
        let fetch = FetchConfig {
            timeout_seconds: parse_var(
                "FEED_TIMEOUT_SECS",
                get("FEED_TIMEOUT_SECS"),
                defaults.timeout_seconds,
            )?,
            max_redirects: parse_var(
                "FEED_MAX_REDIRECTS",
                get("FEED_MAX_REDIRECTS"),
                defaults.max_redirects,
            )?,
            ..defaults
        };

        let item_error_policy = match get("ON_ITEM_ERROR") {
            Some(raw) => raw.parse()?,
            None => ItemErrorPolicy::default(),
        };

        let mail = MailConfig::from_lookup(&lookup)
            .map_err(|e| PipelineError::Config(format!("{:#}", e)))?;

        Ok(Self {
            channel_id,
            lookback_days,
            media_dir: PathBuf::from(get_or("MEDIA_DIR", "video")),
            ytdlp_bin: get_or("YTDLP_BIN", "yt-dlp"),
            subtitle_lang: get_or("SUBTITLE_LANG", "zh.*"),
            uploader_cmd: get_or("UPLOADER_CMD", "python3 python/wss.py"),
            item_error_policy,
            fetch,
            mail,
        })
    }
}

fn parse_var<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| PipelineError::Config(format!("invalid {} '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}
