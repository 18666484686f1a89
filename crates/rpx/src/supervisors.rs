//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where events pile up in files..."
//! 🎬 "One supervisor dared to turn them into reports."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor wires one source to one sink over a bounded channel, starts a worker
//! on each end, waits for both, and tallies what happened.
//!
//! ```text
//! SourceBackend ──pages──▶ [async-channel, bounded] ──pages──▶ SinkWorker ──payload──▶ SinkBackend
//! ```
//!
//! One sink worker, always. Publishes are serialised because the report sink wants them
//! one at a time.
//!
//! ⚠️ The workers stay private. Like Fight Club, but for async tasks.

mod workers;

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use crate::app_config::RuntimeConfig;
use crate::backends::{SinkBackend, SourceBackend};
use crate::progress::RunSummary;
use workers::{SinkWorker, SourceWorker, Worker};

/// 📦 Hovers over the workers asking "is it done yet?" until it is.
#[derive(Debug)]
pub(crate) struct Supervisor {
    runtime: RuntimeConfig,
}

impl Supervisor {
    pub(crate) fn new(runtime: RuntimeConfig) -> Self {
        Self { runtime }
    }

    /// 🧵 Pump every page from `source` into `sink`, then close the sink.
    ///
    /// A failed publish is counted and skipped. A failed read stops the pump, but the sink
    /// still drains what already made it into the channel and gets closed.
    pub(crate) async fn run(&self, source: SourceBackend, sink: SinkBackend) -> Result<RunSummary> {
        let started = Instant::now();
        let (tx, rx) = async_channel::bounded(self.runtime.queue_capacity.max(1));

        let source_handle = SourceWorker::new(tx, source).start();
        let sink_handle = SinkWorker::new(rx, sink).start();

        let source_tally = source_handle
            .await
            .context("💀 The source worker never came back from its shift")?;
        let sink_tally = sink_handle
            .await
            .context("💀 The sink worker never came back from its shift")??;
        let source_tally = source_tally?;

        let summary = RunSummary {
            batches: sink_tally.batches,
            events: source_tally.events,
            reports: sink_tally.published,
            failed: sink_tally.failed,
            elapsed: started.elapsed(),
        };
        info!(
            "🏁 pump finished: {} page(s), {} event(s), {} report(s), {} failed",
            summary.batches, summary.events, summary.reports, summary.failed
        );
        Ok(summary)
    }
}
