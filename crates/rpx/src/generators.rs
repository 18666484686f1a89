//! 🏭 Report generators: one per mode, picked once, never swapped.
//!
//! 🎬 *[three factories share a parking lot. one builds reports from whatever the events look
//! like today. one fills in a template somebody drew years ago. one asks the database.]*
//!
//! | mode    | trigger          | rows from                  | layout from              |
//! |---------|------------------|----------------------------|--------------------------|
//! | Dynamic | event payload    | [`EventDataProvider`]      | schema inferred per batch |
//! | Static  | event payload    | [`EventDataProvider`]      | compiled `.jrxml`        |
//! | Query   | trigger, no data | [`QueryDataProvider`]      | one sub-report per query |
//!
//! Every generator only *assembles*: it returns an [`AssembledReport`] (what to render, with
//! which parameters, to where). [`deliver`] then renders it and hands it to the router. The
//! payload-driven generators have no trigger method and the query generator takes no payload,
//! so a mode cannot be asked to do the other mode's job.
//!
//! [`EventDataProvider`]: crate::providers::EventDataProvider
//! [`QueryDataProvider`]: crate::providers::QueryDataProvider

mod dynamic;
mod query;
mod static_template;

pub use dynamic::DynamicReportGenerator;
pub use query::QueryReportGenerator;
pub use static_template::StaticReportGenerator;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::common::Record;
use crate::config::{DEFAULT_TITLE, Mode, ReportConfig, SinkCreationError};
use crate::render::{
    DESCRIPTION, HEADER_IMAGE, RenderRequest, ReportParameters, ReportRenderer, SUBTITLE, TITLE,
};
use crate::report::ReportModel;
use crate::router::{OutputRouter, ResolvedConfiguration};
use crate::template::CompiledTemplate;

/// 🔀 The sink's one and only strategy, chosen from the validated config.
#[derive(Debug)]
pub enum ReportGenerator {
    Dynamic(DynamicReportGenerator),
    Static(StaticReportGenerator),
    Query(QueryReportGenerator),
}

impl ReportGenerator {
    /// Query mode when configured, else static when a template is set, else dynamic.
    pub fn from_config(config: Arc<ReportConfig>) -> Result<Self, SinkCreationError> {
        let generator = match (config.mode, config.template.is_some()) {
            (Mode::Query, _) => ReportGenerator::Query(QueryReportGenerator::new(config)?),
            (Mode::Stream, true) => ReportGenerator::Static(StaticReportGenerator::new(config)?),
            (Mode::Stream, false) => ReportGenerator::Dynamic(DynamicReportGenerator::new(config)),
        };
        debug!("🏭 report generator selected: {}", generator.label());
        Ok(generator)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportGenerator::Dynamic(_) => "dynamic",
            ReportGenerator::Static(_) => "static",
            ReportGenerator::Query(_) => "query",
        }
    }
}

/// 📦 What to render.
#[derive(Debug)]
pub enum ReportBody<'a> {
    Dynamic {
        model: ReportModel,
        rows: Vec<Record>,
    },
    Template(&'a CompiledTemplate),
}

/// 📦 One report, ready to render: body, parameters, and where it is going.
#[derive(Debug)]
pub struct AssembledReport<'a> {
    pub body: ReportBody<'a>,
    pub parameters: ReportParameters,
    pub resolved: ResolvedConfiguration,
}

impl AssembledReport<'_> {
    pub fn request(&self) -> RenderRequest<'_> {
        match &self.body {
            ReportBody::Dynamic { model, rows } => RenderRequest::Dynamic {
                model,
                rows,
                parameters: &self.parameters,
            },
            ReportBody::Template(template) => RenderRequest::Template {
                template,
                parameters: &self.parameters,
            },
        }
    }
}

/// 🚚 Render an assembled report and write it out. Returns the written path.
pub async fn deliver(
    assembled: AssembledReport<'_>,
    renderer: &dyn ReportRenderer,
    router: &OutputRouter,
) -> Result<PathBuf> {
    let document = renderer.render(assembled.request())?;
    router.publish(&document, &assembled.resolved).await
}

/// 🎒 Title block and header banner, as renderer parameters.
pub(crate) fn metadata_parameters(config: &ReportConfig) -> ReportParameters {
    let mut parameters = ReportParameters::new();
    parameters.set_scalar(TITLE, config.metadata.title.as_str());
    parameters.set_scalar(SUBTITLE, config.metadata.subtitle.as_str());
    parameters.set_scalar(DESCRIPTION, config.metadata.description.as_str());
    if let Some(header) = &config.layout.header_image {
        parameters.set_scalar(HEADER_IMAGE, header.to_string_lossy());
    }
    parameters
}

/// 🏷️ A report is named after the file it lands in.
pub(crate) fn report_name(resolved: &ResolvedConfiguration) -> String {
    Path::new(&resolved.output_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// 🏗️ A fresh model carrying the configured title block and banners.
pub(crate) fn base_model(config: &ReportConfig, resolved: &ResolvedConfiguration) -> ReportModel {
    ReportModel::new(report_name(resolved))
        .with_metadata(config.metadata.clone())
        .with_layout(config.layout.clone())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use crate::common::{Attribute, AttributeType, StreamDefinition};
    use crate::config::ReportConfig;
    use crate::datasource::DataSourceRegistry;

    pub fn stock_stream() -> StreamDefinition {
        let attribute = |name: &str, attribute_type| Attribute {
            name: name.into(),
            attribute_type,
        };
        StreamDefinition {
            name: "StockStream".into(),
            attributes: vec![
                attribute("symbol", AttributeType::String),
                attribute("price", AttributeType::Float),
                attribute("volume", AttributeType::Long),
            ],
        }
    }

    pub fn config(pairs: &[(&str, &str)]) -> anyhow::Result<ReportConfig> {
        config_with(pairs, &DataSourceRegistry::default())
    }

    pub fn config_with(
        pairs: &[(&str, &str)],
        datasources: &DataSourceRegistry,
    ) -> anyhow::Result<ReportConfig> {
        let options: BTreeMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Ok(ReportConfig::validate(
            "TestApp",
            &options,
            &stock_stream(),
            datasources,
        )?)
    }

    pub const STOCK_PAYLOAD: &str = r#"[
        {"event": {"symbol": "WSO2", "price": 55.6, "volume": 100}},
        {"event": {"symbol": "IBM", "price": 75.6, "volume": 200}},
        {"event": {"symbol": "WSO2", "price": 57.6, "volume": 150}}
    ]"#;
}

#[cfg(test)]
mod tests {
    use super::test_support::config;
    use super::*;
    use crate::config::{HEADER, OUTPUT_PATH, SUBTITLE as SUBTITLE_OPTION};

    #[test]
    fn the_one_where_reports_are_named_after_their_files() {
        let resolved = |path: &str| ResolvedConfiguration {
            output_path: path.into(),
            dataset: None,
        };
        assert_eq!(report_name(&resolved("/tmp/ReportWSO2")), "ReportWSO2");
        assert_eq!(report_name(&resolved("")), DEFAULT_TITLE);
    }

    #[test]
    fn the_one_where_the_title_block_becomes_parameters() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let header = dir.path().join("logo.png");
        std::fs::write(&header, [0u8])?;
        let config = config(&[
            (OUTPUT_PATH, "out"),
            (SUBTITLE_OPTION, "Daily"),
            (HEADER, &*header.to_string_lossy()),
        ])?;
        let parameters = metadata_parameters(&config);
        assert_eq!(parameters.scalar(TITLE), Some(DEFAULT_TITLE));
        assert_eq!(parameters.scalar(SUBTITLE), Some("Daily"));
        assert_eq!(
            parameters.scalar(HEADER_IMAGE),
            Some(header.to_string_lossy().as_ref())
        );
        Ok(())
    }

    #[test]
    fn the_one_where_the_mode_picks_the_factory() -> anyhow::Result<()> {
        let generator = ReportGenerator::from_config(Arc::new(config(&[(OUTPUT_PATH, "out")])?))?;
        assert_eq!(generator.label(), "dynamic");
        Ok(())
    }
}
