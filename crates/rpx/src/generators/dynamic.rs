//! 🧱 Dynamic mode: no template, the layout is built from the batch and the chart options.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::chart::apply_chart;
use crate::config::ReportConfig;
use crate::generators::{AssembledReport, ReportBody, base_model, metadata_parameters};
use crate::providers::EventDataProvider;

/// 🧪 Builds the layout from whatever the batch looks like. Schema is re-inferred every call.
#[derive(Debug)]
pub struct DynamicReportGenerator {
    config: Arc<ReportConfig>,
}

impl DynamicReportGenerator {
    pub fn new(config: Arc<ReportConfig>) -> Self {
        Self { config }
    }

    /// 📨 Infer, bind, chart. One payload, one report.
    pub fn assemble(&self, payload: &str) -> Result<AssembledReport<'static>> {
        let provider =
            EventDataProvider::parse(payload).context("Cannot read the published events")?;
        let resolved = provider.resolve(&self.config.output_path, self.config.dataset.as_ref())?;

        let mut model = base_model(&self.config, &resolved);
        provider.bind_to(&mut model)?;
        apply_chart(&self.config.chart.request(), &provider, &mut model)?;
        debug!(
            "🧪 dynamic report '{}' assembled: {} column(s), {} row(s)",
            model.name,
            model.columns().len(),
            provider.rows().len()
        );

        Ok(AssembledReport {
            body: ReportBody::Dynamic {
                model,
                rows: provider.into_rows(),
            },
            parameters: metadata_parameters(&self.config),
            resolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;
    use crate::config::{CATEGORY, CHART, CHART_TITLE, OUTPUT_PATH, SERIES};
    use crate::generators::deliver;
    use crate::generators::test_support::{STOCK_PAYLOAD, config};
    use crate::render::TextRenderer;
    use crate::export::OutputFormat;
    use crate::router::OutputRouter;

    fn generator(pairs: &[(&str, &str)]) -> anyhow::Result<DynamicReportGenerator> {
        Ok(DynamicReportGenerator::new(Arc::new(config(pairs)?)))
    }

    #[test]
    fn the_one_where_a_plain_batch_becomes_a_table() -> anyhow::Result<()> {
        let assembled = generator(&[(OUTPUT_PATH, "/tmp/Report{symbol}")])?.assemble(STOCK_PAYLOAD)?;
        assert_eq!(assembled.resolved.output_path, "/tmp/ReportWSO2");
        let ReportBody::Dynamic { model, rows } = &assembled.body else {
            panic!("dynamic generator should build a dynamic body");
        };
        assert_eq!(model.name, "ReportWSO2");
        assert!(model.table_style().is_some());
        assert!(model.chart().is_none());
        assert_eq!(
            model.columns().iter().map(|c| c.title.as_str()).collect::<Vec<_>>(),
            vec!["Symbol", "Price", "Volume"]
        );
        assert_eq!(rows.len(), 3);
        Ok(())
    }

    #[test]
    fn the_one_where_the_bar_chart_takes_the_first_two_columns() -> anyhow::Result<()> {
        let assembled = generator(&[(OUTPUT_PATH, "out"), (CHART, "bar")])?.assemble(STOCK_PAYLOAD)?;
        let ReportBody::Dynamic { model, .. } = &assembled.body else {
            panic!("dynamic body expected");
        };
        let chart = model.chart().expect("bar chart bound");
        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.category_column.name, "symbol");
        assert_eq!(chart.series_column.name, "price");
        assert!(model.table_style().is_none());
        Ok(())
    }

    #[test]
    fn the_one_where_named_line_axes_keep_their_names() -> anyhow::Result<()> {
        let assembled = generator(&[
            (OUTPUT_PATH, "out"),
            (CHART, "line"),
            (CHART_TITLE, "Volume by symbol"),
            (CATEGORY, "symbol"),
            (SERIES, "volume"),
        ])?
        .assemble(STOCK_PAYLOAD)?;
        let ReportBody::Dynamic { model, .. } = &assembled.body else {
            panic!("dynamic body expected");
        };
        let chart = model.chart().expect("line chart bound");
        assert_eq!(chart.title, "Volume by symbol");
        assert_eq!(chart.category_axis_label.as_deref(), Some("symbol"));
        assert_eq!(chart.value_axis_label.as_deref(), Some("volume"));
        Ok(())
    }

    #[test]
    fn the_one_where_an_empty_batch_is_refused() -> anyhow::Result<()> {
        let generator = generator(&[(OUTPUT_PATH, "out")])?;
        assert!(generator.assemble("[]").is_err());
        Ok(())
    }

    #[test]
    fn the_one_where_each_batch_brings_its_own_schema() -> anyhow::Result<()> {
        let generator = generator(&[(OUTPUT_PATH, "out")])?;
        let first = generator.assemble(STOCK_PAYLOAD)?;
        let second = generator.assemble(r#"{"event": {"symbol": "IBM"}}"#)?;
        let columns = |assembled: &AssembledReport<'_>| match &assembled.body {
            ReportBody::Dynamic { model, .. } => model.columns().len(),
            ReportBody::Template(_) => 0,
        };
        assert_eq!(columns(&first), 3);
        assert_eq!(columns(&second), 1);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_csv_lands_next_to_its_siblings() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("Report{symbol}");
        let generator = generator(&[(OUTPUT_PATH, &*output.to_string_lossy())])?;
        let router = OutputRouter::new(OutputFormat::Csv);

        let written = deliver(generator.assemble(STOCK_PAYLOAD)?, &TextRenderer, &router).await?;
        assert_eq!(written, dir.path().join("ReportWSO2.csv"));
        let csv = std::fs::read_to_string(&written)?;
        assert!(csv.starts_with("Symbol,Price,Volume\r\n"));
        assert!(csv.contains("IBM,75.6,200\r\n"));
        Ok(())
    }
}
