//! 📂 Previously, on "Things That Could Go Wrong With A File"...
//!
//! The events file didn't exist. Or it did, and line 40,212 was half a JSON object
//! because the exporter got killed mid-write. This module reads it anyway, one line at a
//! time, and hands out pages of at most `batch_size` events. Blank lines are skipped.
//! Broken lines are not our problem yet: they travel on, and the sink refuses them. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::{
    fs::File,
    io::{self, AsyncBufReadExt},
};
use tracing::trace;

use crate::backends::Source;
use crate::progress::ProgressMetrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSourceConfig {
    pub path: PathBuf,
    pub batch_size: usize,
}

/// 📂 Reads an NDJSON events file page by page.
pub struct FileSource {
    buf_reader: io::BufReader<File>,
    config: FileSourceConfig,
    progress: ProgressMetrics,
    exhausted: bool,
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("config", &self.config)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl FileSource {
    pub async fn new(config: FileSourceConfig) -> Result<Self> {
        let file_handle = File::open(&config.path).await.with_context(|| {
            format!(
                "💀 The events file '{}' would not open. We knocked. We checked the path \
                 (relative to the working directory, mind you). The door stayed shut.",
                config.path.display()
            )
        })?;

        // -- unknown size just means an unknown percentage
        let file_size = file_handle.metadata().await.map(|m| m.len()).unwrap_or(0);
        let progress = ProgressMetrics::new(config.path.display().to_string(), file_size);

        Ok(Self {
            buf_reader: io::BufReader::new(file_handle),
            config,
            progress,
            exhausted: false,
        })
    }

    pub fn events_read(&self) -> u64 {
        self.progress.total_events()
    }
}

#[async_trait]
impl Source for FileSource {
    async fn next_page(&mut self) -> Result<Vec<String>> {
        if self.exhausted {
            return Ok(Vec::new());
        }

        let batch_size = self.config.batch_size.max(1);
        let mut page = Vec::with_capacity(batch_size);
        let mut total_bytes_read = 0usize;
        let mut line = String::new();

        while page.len() < batch_size {
            let bytes_read = self
                .buf_reader
                .read_line(&mut line)
                .await
                .with_context(|| format!("Cannot read events from '{}'", self.config.path.display()))?;
            if bytes_read == 0 {
                self.exhausted = true;
                break;
            }
            total_bytes_read += bytes_read;

            let event = line.trim();
            if !event.is_empty() {
                page.push(event.to_string());
            }
            line.clear();
        }

        trace!("📖 {} event(s) in {} bytes off '{}'", page.len(), total_bytes_read, self.config.path.display());
        self.progress.update(total_bytes_read as u64, page.len() as u64);
        if self.exhausted {
            self.progress.finish();
        }
        Ok(page)
    }
}
