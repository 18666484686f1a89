//! 🧵 Workers: the ones who actually do the work while the Supervisor takes the credit.
//!
//! ⚠️ "If you're reading this, the code review went poorly." 🦆

use anyhow::Result;
use tokio::task::JoinHandle;

mod sink_worker;
mod source_worker;

pub(super) use sink_worker::SinkWorker;
pub(super) use source_worker::SourceWorker;

/// 🏗️ A background worker that does work and reports back with a tally.
pub(super) trait Worker {
    type Tally: Send + 'static;

    /// 🚀 Spawn onto the runtime. The handle resolves when the worker is done.
    fn start(self) -> JoinHandle<Result<Self::Tally>>;
}
