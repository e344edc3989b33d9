use crate::traits::FileLocator;
use crate::types::{LocalMediaFile, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffixes yt-dlp leaves behind while a download is still in flight.
const PARTIAL_SUFFIXES: [&str; 2] = [".part", ".ytdl"];

/// Finds staged files by item id prefix in a single directory.
pub struct DirectoryLocator {
    dir: PathBuf,
}

impl DirectoryLocator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl FileLocator for DirectoryLocator {
    async fn locate(&self, item_id: &str) -> Result<Vec<LocalMediaFile>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Staging directory {} does not exist", self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(item_id) {
                continue;
            }
            if PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
                debug!("Ignoring partial download {}", name);
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            files.push(LocalMediaFile::new(entry.path()));
        }

        files.sort();
        debug!("Located {} file(s) for {}", files.len(), item_id);
        Ok(files)
    }
}
