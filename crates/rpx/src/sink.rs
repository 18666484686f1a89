//! 🕳️ The report sink: where events go in and files come out.
//!
//! 🎬 *[the host hands over a batch. the sink nods. somewhere, a PDF is born.]*
//!
//! [`ReportSink`] validates its options once, at construction, and picks its generator for
//! life. After that:
//! - stream mode: every [`Sink::publish`] payload becomes one report,
//! - query mode: every [`ReportSink::trigger`] runs the configured queries and writes one
//!   composite report. Published payloads are dropped at debug level and run nothing.
//!
//! A failed publish fails that call only. The sink keeps no buffers and no retry queue, so
//! the next call starts clean. There is no state to checkpoint either: `current_state` is
//! always `None` and `restore_state` does nothing. 🦆

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::backends::Sink;
use crate::common::StreamDefinition;
use crate::config::{Mode, ReportConfig, SinkCreationError};
use crate::datasource::DataSourceRegistry;
use crate::generators::{AssembledReport, ReportGenerator, deliver};
use crate::render::{ReportRenderer, TextRenderer};
use crate::router::OutputRouter;

/// 📄 A configured report sink bound to one stream.
#[derive(Debug)]
pub struct ReportSink {
    config: Arc<ReportConfig>,
    generator: ReportGenerator,
    renderer: Box<dyn ReportRenderer>,
    router: OutputRouter,
    reports_written: u64,
}

impl ReportSink {
    /// 🏗️ Validate `options` against the declared `stream` and build the sink.
    ///
    /// Every configuration problem surfaces here, before the first event, as a
    /// [`SinkCreationError`] naming `app_name`.
    pub fn new(
        app_name: &str,
        options: &BTreeMap<String, String>,
        stream: &StreamDefinition,
        datasources: &DataSourceRegistry,
    ) -> Result<Self, SinkCreationError> {
        let config = Arc::new(ReportConfig::validate(
            app_name,
            options,
            stream,
            datasources,
        )?);
        let generator = ReportGenerator::from_config(Arc::clone(&config))?;
        let router = OutputRouter::new(config.format);
        info!(
            "🕳️ report sink of app {} on stream '{}' ready: {} generator, {} output",
            config.app_name,
            stream.name,
            generator.label(),
            config.format
        );
        Ok(Self {
            config,
            generator,
            renderer: Box::new(TextRenderer),
            router,
            reports_written: 0,
        })
    }

    /// 🖨️ Swap in a different renderer.
    pub fn with_renderer(mut self, renderer: impl ReportRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn reports_written(&self) -> u64 {
        self.reports_written
    }

    /// 🚀 Query mode only: run every configured query and write one composite report.
    pub async fn trigger(&self) -> Result<PathBuf> {
        let ReportGenerator::Query(generator) = &self.generator else {
            bail!(
                "In 'report' sink of app {}: trigger is only available in query mode",
                self.config.app_name
            );
        };
        self.finish(generator.assemble()).await
    }

    /// 📨 One payload, one report. Query mode has no per-event path and refuses.
    pub async fn generate(&self, payload: &str) -> Result<PathBuf> {
        let assembled = match &self.generator {
            ReportGenerator::Dynamic(generator) => generator.assemble(payload),
            ReportGenerator::Static(generator) => generator.assemble(payload),
            ReportGenerator::Query(_) => bail!(
                "In 'report' sink of app {}: trigger is the only entry point in query mode",
                self.config.app_name
            ),
        };
        self.finish(assembled).await
    }

    async fn finish(&self, assembled: Result<AssembledReport<'_>>) -> Result<PathBuf> {
        let app = &self.config.app_name;
        let assembled = assembled
            .with_context(|| format!("In 'report' sink of app {app}: cannot assemble the report"))?;
        deliver(assembled, self.renderer.as_ref(), &self.router)
            .await
            .with_context(|| format!("In 'report' sink of app {app}: cannot write the report"))
    }

    /// Nothing survives a restart. Nothing needs to.
    pub fn current_state(&self) -> Option<BTreeMap<String, String>> {
        None
    }

    pub fn restore_state(&mut self, _state: BTreeMap<String, String>) {}
}

#[async_trait]
impl Sink for ReportSink {
    async fn publish(&mut self, payload: String) -> Result<()> {
        if self.config.mode == Mode::Query {
            debug!(
                "🗄️ report sink of app {} is in query mode, {} byte payload dropped",
                self.config.app_name,
                payload.len()
            );
            return Ok(());
        }
        let written = self.generate(&payload).await?;
        self.reports_written += 1;
        debug!("✅ report #{} at {}", self.reports_written, written.display());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        debug!(
            "🏁 report sink of app {} closed after {} report(s)",
            self.config.app_name, self.reports_written
        );
        Ok(())
    }
}
