use crate::traits::MediaFetcher;
use crate::types::{PipelineError, Result};
use async_trait::async_trait;
use interfaces::defs::watch_url_for;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Downloads a video plus its subtitles with yt-dlp into a staging directory.
pub struct YtDlpFetcher {
    program: String,
    output_dir: PathBuf,
    subtitle_lang: String,
}

impl YtDlpFetcher {
    pub fn new(
        program: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        subtitle_lang: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            output_dir: output_dir.into(),
            subtitle_lang: subtitle_lang.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Arguments passed to yt-dlp for one video.
    pub fn build_args(&self, item_id: &str) -> Vec<String> {
        let template = self.output_dir.join(format!("{}.%(ext)s", item_id));

        vec![
            "--no-simulate".to_string(),
            "--no-check-certificates".to_string(),
            "--no-warnings".to_string(),
            "--progress".to_string(),
            "-S".to_string(),
            "ext".to_string(),
            "--add-header".to_string(),
            "referer:youtube.com".to_string(),
            "--add-header".to_string(),
            "user-agent:googlebot".to_string(),
            "--write-subs".to_string(),
            "--sub-langs".to_string(),
            self.subtitle_lang.clone(),
            "--sub-format".to_string(),
            "srt".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            watch_url_for(item_id),
        ]
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, item_id: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let args = self.build_args(item_id);
        info!("Downloading {} into {}", item_id, self.output_dir.display());
        debug!("{} {}", self.program, args.join(" "));

        // Progress goes straight to the operator's terminal.
        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| PipelineError::MediaFetch {
                id: item_id.to_string(),
                reason: format!("failed to spawn {}: {}. Is it installed?", self.program, e),
            })?;

        if !status.success() {
            return Err(PipelineError::MediaFetch {
                id: item_id.to_string(),
                reason: format!("{} exited with {}", self.program, status),
            });
        }

        info!("Download finished for {}", item_id);
        Ok(())
    }
}
