//! 📊 rpx: events in, reports out.
//!
//! A report sink for a stream processor. It takes batches of JSON events (or, in query
//! mode, the result of SQL queries) and writes them out as PDF, CSV, XLS or XLSX reports,
//! one file per publish. [`sink::ReportSink`] is the library surface. [`run`] is the
//! pump the CLI uses to feed it from a file. 🦆

pub mod app_config;
pub mod backends;
pub mod chart;
pub mod common;
pub mod config;
pub mod datasource;
pub mod export;
pub mod generators;
pub mod progress;
pub mod providers;
pub mod render;
pub mod report;
pub mod router;
pub mod schema;
pub mod sink;
pub mod style;
pub mod template;
mod supervisors;

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use crate::app_config::AppConfig;
use crate::backends::{FileSource, FileSourceConfig, Sink, SinkBackend, SourceBackend};
use crate::config::Mode;
use crate::progress::RunSummary;
use crate::sink::ReportSink;
use crate::supervisors::Supervisor;

/// 🚀 Build the sink from `app_config` and run it once to completion.
///
/// - stream mode: every page of `runtime.input` becomes one publish, one report.
/// - query mode: one trigger, one composite report. The input file is not read.
pub async fn run(app_config: AppConfig) -> Result<RunSummary> {
    let started = Instant::now();
    let mut sink = ReportSink::new(
        &app_config.app_name,
        &app_config.sink,
        &app_config.stream,
        &app_config.datasource_registry(),
    )?;

    match sink.mode() {
        Mode::Query => {
            let written = sink.trigger().await?;
            sink.close().await?;
            info!("🗄️ query report written to {}", written.display());
            Ok(RunSummary {
                batches: 1,
                reports: 1,
                elapsed: started.elapsed(),
                ..RunSummary::default()
            })
        }
        Mode::Stream => {
            let input = app_config.runtime.input.clone().with_context(|| {
                format!(
                    "💀 App {} is in stream mode but [runtime] has no 'input' events file to read.",
                    app_config.app_name
                )
            })?;
            let source = FileSource::new(FileSourceConfig {
                path: input,
                batch_size: app_config.runtime.batch_size,
            })
            .await?;
            Supervisor::new(app_config.runtime.clone())
                .run(SourceBackend::File(source), SinkBackend::Report(sink))
                .await
                .context("Failed to pump events into the report sink")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use super::*;
    use crate::app_config::RuntimeConfig;
    use crate::common::{Attribute, AttributeType, StreamDefinition};
    use crate::datasource::DataSourceConfig;

    fn app_config(sink: &[(&str, &str)], runtime: RuntimeConfig) -> AppConfig {
        AppConfig {
            app_name: "StockApp".into(),
            stream: StreamDefinition {
                name: "StockStream".into(),
                attributes: vec![
                    Attribute {
                        name: "symbol".into(),
                        attribute_type: AttributeType::String,
                    },
                    Attribute {
                        name: "volume".into(),
                        attribute_type: AttributeType::Long,
                    },
                ],
            },
            sink: sink
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            datasources: BTreeMap::new(),
            runtime,
        }
    }

    fn output(dir: &Path, name: &str) -> String {
        dir.join(name).to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn the_one_where_a_file_of_events_becomes_a_folder_of_reports() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("events.ndjson");
        std::fs::write(
            &input,
            "{\"event\":{\"symbol\":\"WSO2\",\"volume\":100}}\n\
             {\"event\":{\"symbol\":\"WSO2\",\"volume\":150}}\n\
             {\"event\":{\"symbol\":\"IBM\",\"volume\":200}}\n",
        )?;
        let output = output(dir.path(), "Report{symbol}");
        let config = app_config(
            &[("outputpath", &*output), ("output.format", "csv")],
            RuntimeConfig {
                input: Some(input),
                batch_size: 2,
                queue_capacity: 1,
            },
        );

        let summary = run(config).await?;

        assert_eq!(summary.events, 3);
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.reports, 2);
        let first = std::fs::read_to_string(dir.path().join("ReportWSO2.csv"))?;
        assert!(first.contains("WSO2,150"));
        assert!(dir.path().join("ReportIBM.csv").exists());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_stream_mode_forgot_its_input() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = output(dir.path(), "Report");
        let error = run(app_config(&[("outputpath", &*output)], RuntimeConfig::default()))
            .await
            .expect_err("no input file");
        assert!(error.to_string().contains("no 'input' events file"));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_bad_option_stops_everything_before_it_starts() -> anyhow::Result<()> {
        let error = run(app_config(
            &[("outputpath", "out"), ("chart", "radar")],
            RuntimeConfig::default(),
        ))
        .await
        .expect_err("radar is not a chart we draw");
        assert!(error.to_string().starts_with("In 'report' sink of app StockApp:"));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_query_mode_asks_the_database_once() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let database = dir.path().join("stocks.db");
        let connection = rusqlite::Connection::open(&database)?;
        connection.execute_batch(
            "CREATE TABLE StockTable (symbol TEXT, volume BIGINT);
             INSERT INTO StockTable VALUES ('WSO2', 100);",
        )?;
        drop(connection);

        let output = output(dir.path(), "StockReport");
        let mut config = app_config(
            &[
                ("outputpath", &*output),
                ("output.format", "xlsx"),
                ("mode", "query"),
                ("datasource.name", "stocks"),
                ("queries", r#"[{"query":"SELECT * FROM StockTable","chart":"table"}]"#),
            ],
            RuntimeConfig::default(),
        );
        config.datasources.insert(
            "stocks".into(),
            DataSourceConfig {
                path: database,
                read_only: true,
            },
        );

        let summary = run(config).await?;

        assert_eq!(summary.reports, 1);
        assert_eq!(summary.events, 0);
        assert!(dir.path().join("StockReport.xlsx").exists());
        Ok(())
    }
}
