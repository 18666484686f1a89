//! 📜 Template mode: a compiled `.jrxml` whose dataset slots get the published rows.
//!
//! 🎬 *[the layout was decided in 2014. the data arrives every few seconds.]*

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::{CreationErrorKind, ReportConfig, SinkCreationError};
use crate::generators::{AssembledReport, ReportBody};
use crate::providers::EventDataProvider;
use crate::render::ReportParameters;
use crate::template::CompiledTemplate;

/// 📜 Fills a compiled `.jrxml` template with event rows.
///
/// The template is loaded and compiled once, here, at construction. A template without a
/// single dataset slot is refused outright. More than one slot is tolerated with a warning,
/// and then each publish partitions the batch and offers every partition under its own name.
#[derive(Debug)]
pub struct StaticReportGenerator {
    config: Arc<ReportConfig>,
    template: CompiledTemplate,
    slots: Vec<String>,
}

impl StaticReportGenerator {
    pub fn new(config: Arc<ReportConfig>) -> Result<Self, SinkCreationError> {
        let fail = |kind: CreationErrorKind| SinkCreationError::new(config.app_name.as_str(), kind);
        let Some(path) = config.template.as_deref() else {
            return Err(fail(CreationErrorKind::MissingParameter(crate::config::TEMPLATE)));
        };
        let template = CompiledTemplate::load(path).map_err(|error| fail(error.into()))?;

        let slots: Vec<String> = template
            .dataset_slots()
            .into_iter()
            .map(|slot| slot.name.clone())
            .collect();
        if slots.is_empty() {
            return Err(fail(CreationErrorKind::DatasetsMissing {
                path: path.to_path_buf(),
            }));
        }
        if slots.len() > 1 {
            warn!(
                "⚠️ In 'report' sink of app {}: Too many parameters for dataset. Expected 1, found {}",
                config.app_name,
                slots.len()
            );
        }
        for (option, value) in &config.ignored_options {
            debug!(
                "🙈 In 'report' sink of app {}: ignoring {} for {} as a template is provided",
                config.app_name, value, option
            );
        }

        Ok(Self {
            config,
            template,
            slots,
        })
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// 📨 Route the batch into the template's dataset slots.
    pub fn assemble(&self, payload: &str) -> Result<AssembledReport<'_>> {
        let provider =
            EventDataProvider::parse(payload).context("Cannot read the published events")?;
        let resolved = provider.resolve(&self.config.output_path, self.config.dataset.as_ref())?;

        let mut parameters = ReportParameters::new();
        match self.slots.as_slice() {
            [only] => parameters.set_dataset(only.as_str(), provider.into_rows()),
            _ => {
                for partition in provider.partition_by(self.config.partition_attribute())? {
                    parameters.set_dataset(partition.name, partition.rows);
                }
            }
        }
        debug!(
            "📜 template '{}' filled: dataset(s) [{}]",
            self.template.name(),
            parameters.dataset_names().collect::<Vec<_>>().join(", ")
        );

        Ok(AssembledReport {
            body: ReportBody::Template(&self.template),
            parameters,
            resolved,
        })
    }
}
