//! # Previously, on rpx...
//!
//! 🎬 Somebody needed to test the pump without a disk, without a database, and without
//! a single PDF. This module lives entirely in RAM, gone the moment you blink.
//!
//! - [`InMemorySource`] replays a fixed list of event lines in pages, then goes quiet.
//! - [`InMemorySink`] hoards every payload behind an `Arc<Mutex<..>>` so tests can peek.
//!   It can also be told to refuse payloads containing a marker, for the sad-path tests.
//!
//! ⚠️ Not for production. If you deploy this, also deploy a therapist. 🦆

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backends::{Sink, Source};

/// 📦 Hands out its lines `page_size` at a time. Once empty, always empty.
#[derive(Debug, Default)]
pub struct InMemorySource {
    lines: VecDeque<String>,
    page_size: usize,
}

impl InMemorySource {
    pub fn new(lines: impl IntoIterator<Item = impl Into<String>>, page_size: usize) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            page_size: page_size.max(1),
        }
    }
}

#[async_trait]
impl Source for InMemorySource {
    async fn next_page(&mut self) -> Result<Vec<String>> {
        let take = self.page_size.min(self.lines.len());
        Ok(self.lines.drain(..take).collect())
    }
}

/// 📦 A sink that never forgets. Clone it before handing it off; the clones share the vault.
#[derive(Debug, Default, Clone)]
pub struct InMemorySink {
    pub received: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<Mutex<bool>>,
    reject_marker: Option<String>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 💀 Refuse any payload containing `marker`.
    pub fn rejecting(marker: impl Into<String>) -> Self {
        Self {
            reject_marker: Some(marker.into()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn publish(&mut self, payload: String) -> Result<()> {
        if let Some(marker) = &self.reject_marker {
            if payload.contains(marker.as_str()) {
                bail!("payload refused: contains '{marker}'");
            }
        }
        self.received.lock().await.push(payload);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        *self.closed.lock().await = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_the_source_runs_dry_politely() -> anyhow::Result<()> {
        let mut source = InMemorySource::new(["a", "b", "c"], 2);
        assert_eq!(source.next_page().await?, vec!["a", "b"]);
        assert_eq!(source.next_page().await?, vec!["c"]);
        assert!(source.next_page().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_sink_keeps_receipts() -> anyhow::Result<()> {
        let sink = InMemorySink::rejecting("boom");
        let mut handed_off = sink.clone();
        handed_off.publish("[1]".into()).await?;
        assert!(handed_off.publish("[\"boom\"]".into()).await.is_err());
        handed_off.close().await?;

        assert_eq!(*sink.received.lock().await, vec!["[1]".to_string()]);
        assert!(*sink.closed.lock().await);
        Ok(())
    }
}
