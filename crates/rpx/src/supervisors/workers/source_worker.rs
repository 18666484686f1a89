use anyhow::{Context, Result};
use async_channel::Sender;
use tokio::task::JoinHandle;
use tracing::debug;

use super::Worker;
use crate::backends::{Source, SourceBackend};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(in crate::supervisors) struct SourceTally {
    pub pages: u64,
    pub events: u64,
}

/// 🚰 Reads pages until the source runs dry, sends each one down the channel.
///
/// Dropping the sender at the end is what tells the sink worker to wrap up.
#[derive(Debug)]
pub(in crate::supervisors) struct SourceWorker {
    tx: Sender<Vec<String>>,
    source: SourceBackend,
}

impl SourceWorker {
    pub(in crate::supervisors) fn new(tx: Sender<Vec<String>>, source: SourceBackend) -> Self {
        Self { tx, source }
    }
}

impl Worker for SourceWorker {
    type Tally = SourceTally;

    fn start(mut self) -> JoinHandle<Result<SourceTally>> {
        tokio::spawn(async move {
            let mut tally = SourceTally::default();
            loop {
                let page = self
                    .source
                    .next_page()
                    .await
                    .context("SourceWorker failed to read the next page")?;
                if page.is_empty() {
                    debug!("🏁 SourceWorker: source ran dry after {} page(s)", tally.pages);
                    return Ok(tally);
                }
                tally.pages += 1;
                tally.events += page.len() as u64;
                self.tx
                    .send(page)
                    .await
                    .context("SourceWorker lost the channel, the sink end hung up early")?;
            }
        })
    }
}
