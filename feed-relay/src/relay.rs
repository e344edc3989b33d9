//! Uploader subprocess wrapper.
//!
//! The uploader prints human-readable progress and, on success, a line with
//! the public link of the stored file. Nothing else comes back from it, so both
//! pipes are buffered and scanned once the process has exited. The scanned text
//! is all of stdout followed by all of stderr, not an interleaved stream.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::traits::Relay;
use crate::types::{LocalMediaFile, PipelineError, Result};

/// Prefix the uploader prints in front of the public link ("public link:").
pub const PUBLIC_LINK_MARKER: &str = "公共链接：";

static PUBLIC_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?m){}(https?://(?:www\.)?[-a-zA-Z0-9@:%._+~#=]{{1,256}}\.[a-zA-Z0-9()]{{1,6}}\b[-a-zA-Z0-9()!@:%_+.~#?&/=]*)",
        regex::escape(PUBLIC_LINK_MARKER)
    );
    Regex::new(&pattern).expect("valid regex")
});

/// First public link found in the uploader output, if any.
pub fn extract_link(output: &str) -> Option<String> {
    PUBLIC_LINK_RE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Runs `{program} {args..} upload {path}` for every file.
///
/// A link on either pipe is found; stdout is searched before stderr.
pub struct CommandRelay {
    program: String,
    args: Vec<String>,
}

impl CommandRelay {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a whitespace separated command line such as `python3 python/wss.py`.
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| PipelineError::Config("uploader command is empty".to_string()))?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn upload_failed(path: PathBuf, reason: impl Into<String>) -> PipelineError {
        PipelineError::UploadFailed {
            path,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Relay for CommandRelay {
    async fn relay(&self, file: &LocalMediaFile) -> Result<String> {
        let path = file.path().to_path_buf();
        info!("Uploading {}", path.display());

        // `output` drains both pipes until exit; dropping the future kills the child.
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("upload")
            .arg(&path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Self::upload_failed(path.clone(), format!("failed to spawn {}: {}", self.program, e))
            })?;

        // Concatenated, not merged: write order across the two pipes is lost.
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        debug!("Uploader output for {}:\n{}", path.display(), combined);

        if !output.status.success() {
            warn!("Uploader exited with {} for {}", output.status, path.display());
            return Err(Self::upload_failed(
                path,
                format!("uploader exited with {}", output.status),
            ));
        }

        match extract_link(&combined) {
            Some(link) => {
                info!("Uploaded {} -> {}", file.file_name(), link);
                Ok(link)
            }
            None => Err(Self::upload_failed(path, "no public link in uploader output")),
        }
    }
}
