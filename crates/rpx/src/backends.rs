//! 🔌 Backends: where events come from and where they end up.
//!
//! 🚰 Sources pour pages of raw event lines. Sinks take one payload at a time and turn it
//! into something a human might print out and staple.
//!
//! 🎭 Two of each:
//! - [`FileSource`] reads an NDJSON events file; [`InMemorySource`] replays lines from RAM.
//! - [`ReportSink`] writes reports; [`InMemorySink`] just remembers what it was given.
//!
//! The enums dispatch, so the workers never learn which one they are talking to.
//! Ancient proverb: "He who hardcodes the backend, migrates only once." 🦆

use anyhow::Result;
use async_trait::async_trait;

pub(crate) mod file;
pub(crate) mod in_mem;

pub use file::{FileSource, FileSourceConfig};
pub use in_mem::{InMemorySink, InMemorySource};

use crate::sink::ReportSink;

// ===== Source Trait and Backend Enum =====

/// 🚰 A source of event pages.
///
/// # Contract
/// - `next_page` returns raw event lines, one JSON event per line, until the well runs dry.
/// - An empty page means the well is dry. Every call after that is empty too.
#[async_trait]
pub trait Source: std::fmt::Debug {
    async fn next_page(&mut self) -> Result<Vec<String>>;
}

#[derive(Debug)]
pub enum SourceBackend {
    File(FileSource),
    InMemory(InMemorySource),
}

#[async_trait]
impl Source for SourceBackend {
    async fn next_page(&mut self) -> Result<Vec<String>> {
        match self {
            SourceBackend::File(source) => source.next_page().await,
            SourceBackend::InMemory(source) => source.next_page().await,
        }
    }
}

// ===== Sink Trait and Backend Enum =====

/// 🕳️ Something that takes one event payload at a time.
///
/// # Contract
/// - `publish` receives a JSON payload (one event or an array of events). A failed publish
///   fails that call only; the sink must accept the next one.
/// - `close` is called once, after the last publish. Skipping it is a bug. It is also rude.
#[async_trait]
pub trait Sink: std::fmt::Debug {
    async fn publish(&mut self, payload: String) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

#[derive(Debug)]
pub enum SinkBackend {
    Report(ReportSink),
    InMemory(InMemorySink),
}

#[async_trait]
impl Sink for SinkBackend {
    async fn publish(&mut self, payload: String) -> Result<()> {
        match self {
            SinkBackend::Report(sink) => sink.publish(payload).await,
            SinkBackend::InMemory(sink) => sink.publish(payload).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            SinkBackend::Report(sink) => sink.close().await,
            SinkBackend::InMemory(sink) => sink.close().await,
        }
    }
}
