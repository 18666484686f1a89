//! 🗄️ Query mode: every configured SQL statement becomes one sub-report of a composite.
//! Runs on trigger only. Published batches never reach it.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::chart::{ChartKind, ChartRequest, apply_chart};
use crate::config::{CreationErrorKind, QueryConfig, ReportConfig, SinkCreationError};
use crate::generators::{AssembledReport, ReportBody, base_model, metadata_parameters};
use crate::providers::{DataProvider, QueryDataProvider};
use crate::report::{ReportModel, Subreport};
use crate::router::ResolvedConfiguration;

/// 🗄️ One composite report per trigger: every configured query becomes a sub-report.
///
/// Nothing is carried between triggers. Each trigger opens one connection per query, closes
/// it, and builds the whole parent report from scratch. Any failing query fails the trigger.
#[derive(Debug)]
pub struct QueryReportGenerator {
    config: Arc<ReportConfig>,
}

impl QueryReportGenerator {
    pub fn new(config: Arc<ReportConfig>) -> Result<Self, SinkCreationError> {
        if config.query.is_none() {
            return Err(SinkCreationError::new(
                config.app_name.as_str(),
                CreationErrorKind::MissingQueryParameter(crate::config::QUERIES),
            ));
        }
        Ok(Self { config })
    }

    fn query_config(&self) -> Result<&QueryConfig> {
        self.config
            .query
            .as_ref()
            .context("query mode without a query configuration")
    }

    /// 🚀 Run every query and stitch the results into one parent report.
    pub fn assemble(&self) -> Result<AssembledReport<'static>> {
        let query = self.query_config()?;
        let resolved =
            ResolvedConfiguration::unresolved(&self.config.output_path, self.config.dataset.as_ref());
        let mut parent = base_model(&self.config, &resolved);
        let mut parameters = metadata_parameters(&self.config);
        let mut all_rows = Vec::new();

        for spec in &query.queries {
            let provider = QueryDataProvider::execute(&query.datasource, &spec.query)?;
            let mut child = ReportModel::new(spec.name.as_str());
            provider.bind_to(&mut child)?;

            // -- charts fall back to the provider's positional columns, by name
            let (category, series) = match spec.chart {
                ChartKind::Table => (spec.category.clone(), spec.series.clone()),
                _ => (
                    Some(match &spec.category {
                        Some(category) => category.clone(),
                        None => provider.category_column(None)?.name,
                    }),
                    Some(match &spec.series {
                        Some(series) => series.clone(),
                        None => provider.series_column(None)?.name,
                    }),
                ),
            };
            let request = ChartRequest {
                kind: spec.chart,
                title: &spec.chart_title,
                category: category.as_deref(),
                series: series.as_deref(),
            };
            apply_chart(&request, &provider, &mut child)
                .with_context(|| format!("Cannot bind the {} chart of query '{}'", spec.chart, spec.query))?;

            let rows = provider.into_rows();
            debug!(
                "🧩 sub-report '{}' from '{}': {} row(s)",
                spec.name,
                spec.query,
                rows.len()
            );
            all_rows.extend(rows.iter().cloned());
            parameters.set_dataset(spec.name.as_str(), rows);
            parent.add_subreport(Subreport {
                name: spec.name.clone(),
                model: child,
            })?;
        }

        info!(
            "🗄️ query report '{}' assembled from {} quer(ies), {} row(s) in total",
            parent.name,
            query.queries.len(),
            all_rows.len()
        );
        Ok(AssembledReport {
            body: ReportBody::Dynamic {
                model: parent,
                rows: all_rows,
            },
            parameters,
            resolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use rusqlite::Connection;

    use super::*;
    use crate::config::{DATASOURCE_NAME, MODE, OUTPUT_PATH, QUERIES};
    use crate::datasource::{DataSourceConfig, DataSourceRegistry};
    use crate::export::OutputFormat;
    use crate::generators::deliver;
    use crate::generators::test_support::config_with;
    use crate::render::TextRenderer;
    use crate::router::OutputRouter;

    fn stock_database(path: &Path) -> anyhow::Result<()> {
        let connection = Connection::open(path)?;
        connection.execute_batch(
            "CREATE TABLE StockTable (symbol TEXT, price REAL, volume BIGINT);
             INSERT INTO StockTable VALUES ('WSO2', 55.6, 100);
             INSERT INTO StockTable VALUES ('IBM', 75.6, 200);",
        )?;
        Ok(())
    }

    fn generator(dir: &Path, queries: &str) -> anyhow::Result<QueryReportGenerator> {
        let database = dir.join("stocks.db");
        stock_database(&database)?;
        let registry = DataSourceRegistry::new(BTreeMap::from([(
            "stocks".to_string(),
            DataSourceConfig {
                path: database,
                read_only: true,
            },
        )]));
        let output = dir.join("StockReport");
        let config = config_with(
            &[
                (OUTPUT_PATH, &*output.to_string_lossy()),
                (MODE, "query"),
                (DATASOURCE_NAME, "stocks"),
                (QUERIES, queries),
            ],
            &registry,
        )?;
        Ok(QueryReportGenerator::new(Arc::new(config))?)
    }

    fn parent<'a>(assembled: &'a AssembledReport<'a>) -> &'a ReportModel {
        match &assembled.body {
            ReportBody::Dynamic { model, .. } => model,
            ReportBody::Template(_) => panic!("query reports are never templates"),
        }
    }

    #[test]
    fn the_one_where_a_table_query_adds_no_chart() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(
            dir.path(),
            r#"[{"query":"SELECT * FROM StockTable","chart":"table"}]"#,
        )?;
        let assembled = generator.assemble()?;
        let subreports = parent(&assembled).subreports();
        assert_eq!(subreports.len(), 1);
        assert!(subreports[0].model.chart().is_none());
        assert!(subreports[0].model.table_style().is_some());
        assert_eq!(
            assembled.parameters.dataset(&subreports[0].name).map(<[_]>::len),
            Some(2)
        );
        Ok(())
    }

    #[test]
    fn the_one_where_every_query_gets_a_seat_at_the_table() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(
            dir.path(),
            r#"[{"query":"SELECT * FROM StockTable","chart":"table"},
                {"query":"SELECT symbol, volume FROM StockTable","chart":"line","chart.title":"Volume"}]"#,
        )?;
        let assembled = generator.assemble()?;
        let subreports = parent(&assembled).subreports();
        assert_eq!(subreports.len(), 2);

        let chart = subreports[1].model.chart().expect("line chart bound");
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.series_column.name, "volume");
        // -- defaults become names, and named line charts label axes with those names
        assert_eq!(chart.category_axis_label.as_deref(), Some("symbol"));
        let ReportBody::Dynamic { rows, .. } = &assembled.body else {
            panic!("dynamic body expected");
        };
        assert_eq!(rows.len(), 4);
        Ok(())
    }

    #[test]
    fn the_one_where_the_same_query_twice_is_two_subreports() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(
            dir.path(),
            r#"[{"query":"SELECT * FROM StockTable","chart":"table"},
                {"query":"SELECT * FROM StockTable","chart":"table"}]"#,
        )?;
        let assembled = generator.assemble()?;
        let subreports = parent(&assembled).subreports();
        assert_eq!(subreports.len(), 2);
        assert_ne!(subreports[0].name, subreports[1].name);
        for subreport in subreports {
            assert_eq!(assembled.parameters.dataset(&subreport.name).map(<[_]>::len), Some(2));
        }
        // -- and again on the next trigger, nothing left over from the first
        assert_eq!(parent(&generator.assemble()?).subreports().len(), 2);
        Ok(())
    }

    #[test]
    fn the_one_where_lookups_shrug_at_case() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(
            dir.path(),
            r#"[{"query":"SELECT symbol, volume FROM StockTable","chart":"bar","category":"SYMBOL","series":"Volume"}]"#,
        )?;
        let assembled = generator.assemble()?;
        let chart = parent(&assembled).subreports()[0]
            .model
            .chart()
            .expect("bar chart bound")
            .clone();
        assert_eq!(chart.category_column.name, "symbol");
        assert_eq!(chart.value_axis_label.as_deref(), Some("Volume"));
        Ok(())
    }

    #[test]
    fn the_one_where_a_broken_query_breaks_the_whole_trigger() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(
            dir.path(),
            r#"[{"query":"SELECT * FROM StockTable","chart":"table"},
                {"query":"SELECT * FROM NoSuchTable","chart":"table"}]"#,
        )?;
        let error = generator.assemble().expect_err("missing table");
        assert!(format!("{error:#}").contains("Cannot retrieve records from datasource 'stocks'."));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_text_series_fails_at_render_time() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(
            dir.path(),
            r#"[{"query":"SELECT symbol, symbol AS label FROM StockTable","chart":"pie"}]"#,
        )?;
        let router = OutputRouter::new(OutputFormat::Pdf);
        let error = deliver(generator.assemble()?, &TextRenderer, &router)
            .await
            .expect_err("text series");
        assert!(error.to_string().contains("Provide a numeric series column"));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_composite_lands_as_a_pdf() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(
            dir.path(),
            r#"[{"query":"SELECT * FROM StockTable","chart":"table"},
                {"query":"SELECT symbol, price FROM StockTable","chart":"bar"}]"#,
        )?;
        let router = OutputRouter::new(OutputFormat::Pdf);
        let written = deliver(generator.assemble()?, &TextRenderer, &router).await?;
        assert_eq!(written, dir.path().join("StockReport.pdf"));
        let bytes = std::fs::read(&written)?;
        assert!(bytes.starts_with(b"%PDF-1.4"));
        Ok(())
    }
}
