//! 🎬 *[a channel fills with pages. somewhere, a sink waits.]*
//! *[the clock on the wall reads 2:47am.]*
//!
//! 🗑️ The SinkWorker drains the channel, one page at a time, into the sink. It is the
//! most emotionally stable part of this codebase: a page the sink refuses gets a warning
//! and a tally mark, and then the next page gets its turn. 🦆

use anyhow::{Context, Result};
use async_channel::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Worker;
use crate::backends::{Sink, SinkBackend};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(in crate::supervisors) struct SinkTally {
    pub batches: u64,
    pub published: u64,
    pub failed: u64,
}

#[derive(Debug)]
pub(in crate::supervisors) struct SinkWorker {
    rx: Receiver<Vec<String>>,
    sink: SinkBackend,
}

impl SinkWorker {
    pub(in crate::supervisors) fn new(rx: Receiver<Vec<String>>, sink: SinkBackend) -> Self {
        Self { rx, sink }
    }
}

/// 📦 One page of event lines as one JSON array payload.
fn to_payload(page: &[String]) -> String {
    format!("[{}]", page.join(","))
}

impl Worker for SinkWorker {
    type Tally = SinkTally;

    fn start(mut self) -> JoinHandle<Result<SinkTally>> {
        tokio::spawn(async move {
            debug!("📥 SinkWorker started draining channel...");
            let mut tally = SinkTally::default();
            // -- recv errors only once the channel is empty and every sender is gone
            while let Ok(page) = self.rx.recv().await {
                tally.batches += 1;
                debug!("🪣 SinkWorker received page #{} of {} event(s)", tally.batches, page.len());
                match self.sink.publish(to_payload(&page)).await {
                    Ok(()) => tally.published += 1,
                    Err(error) => {
                        tally.failed += 1;
                        warn!("⚠️ page #{} was not published: {:#}", tally.batches, error);
                    }
                }
            }
            debug!("🏁 SinkWorker: Channel closed. Shutting down.");
            self.sink
                .close()
                .await
                .context("SinkWorker failed to close sink")?;
            Ok(tally)
        })
    }
}
