//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am) 🦆
//!
//! One file describes one sink on one stream:
//!
//! ```toml
//! app_name = "StockApp"
//!
//! [stream]
//! name = "StockStream"
//! attributes = [
//!     { name = "symbol", type = "string" },
//!     { name = "volume", type = "long" },
//! ]
//!
//! [sink]
//! outputpath = "/tmp/reports/Report{symbol}"
//! "output.format" = "csv"
//!
//! [datasources.stocks]
//! path = "/var/lib/stocks.db"
//!
//! [runtime]
//! input = "events.ndjson"
//! batch_size = 100
//! ```
//!
//! The `[sink]` table stays a bag of strings here. [`ReportConfig::validate`] is the one
//! place that gives it meaning.
//!
//! [`ReportConfig::validate`]: crate::config::ReportConfig::validate

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::common::StreamDefinition;
use crate::datasource::{DataSourceConfig, DataSourceRegistry};

/// 📦 The AppConfig: one struct to rule them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 🏷️ Names the sink in every setup and runtime error.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    pub stream: StreamDefinition,
    /// 📋 Raw sink options, validated later.
    pub sink: BTreeMap<String, String>,
    #[serde(default)]
    pub datasources: BTreeMap<String, DataSourceConfig>,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    pub fn datasource_registry(&self) -> DataSourceRegistry {
        DataSourceRegistry::new(self.datasources.clone())
    }
}

fn default_app_name() -> String {
    "rpx".to_string()
}

/// 🚰 Knobs for the pump that feeds the sink. Query mode ignores all of them.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// 📂 NDJSON events file, one event per line. Required in stream mode.
    #[serde(default)]
    pub input: Option<PathBuf>,
    /// 📦 Events per publish.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// ✉️ Pages allowed in flight between the reader and the sink.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_batch_size() -> usize {
    100
}

fn default_queue_capacity() -> usize {
    10
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            input: None,
            batch_size: default_batch_size(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// 🚀 Load the config from `RPX_*` environment variables, plus a TOML file when given.
///
/// TOML wins on conflicts. No file means env vars only, no silent fallback to some
/// default file name. Ancient proverb: "He who defaults to config.toml uninvited,
/// deploys to production alone."
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("RPX_"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (RPX_*). \
             Check the [stream] and [sink] tables, both are required.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (RPX_*). \
                 No file was provided, so this one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::AttributeType;

    fn write_test_config(dir: &Path, contents: &str) -> anyhow::Result<PathBuf> {
        let path = dir.join("rpx.toml");
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    #[test]
    fn the_one_where_the_whole_sink_fits_in_one_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config_path = write_test_config(
            dir.path(),
            r#"
            app_name = "StockApp"

            [stream]
            name = "StockStream"
            attributes = [
                { name = "symbol", type = "string" },
                { name = "price", type = "double" },
            ]

            [sink]
            outputpath = "/tmp/Report{symbol}"
            "output.format" = "csv"
            "chart.title" = "Prices"

            [datasources.stocks]
            path = "stocks.db"

            [runtime]
            input = "events.ndjson"
            batch_size = 25
            "#,
        )?;

        let app_config = load_config(Some(config_path.as_path()))?;

        assert_eq!(app_config.app_name, "StockApp");
        assert_eq!(app_config.stream.attributes.len(), 2);
        assert_eq!(app_config.stream.attributes[1].attribute_type, AttributeType::Double);
        assert_eq!(app_config.sink.get("output.format").map(String::as_str), Some("csv"));
        assert_eq!(app_config.sink.get("chart.title").map(String::as_str), Some("Prices"));
        assert_eq!(app_config.runtime.batch_size, 25);
        assert_eq!(app_config.runtime.queue_capacity, 10);
        assert_eq!(app_config.runtime.input, Some(PathBuf::from("events.ndjson")));
        assert!(app_config.datasource_registry().lookup("stocks").is_some());
        Ok(())
    }

    #[test]
    fn the_one_where_defaults_show_up_uninvited_but_helpful() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config_path = write_test_config(
            dir.path(),
            r#"
            [stream]
            name = "S"

            [sink]
            outputpath = "out"
            "#,
        )?;

        let app_config: AppConfig = Figment::new()
            .merge(Toml::file(config_path.as_path()))
            .extract()?;

        assert_eq!(app_config.app_name, "rpx");
        assert_eq!(app_config.runtime, RuntimeConfig::default());
        assert!(app_config.stream.attributes.is_empty());
        assert!(app_config.datasources.is_empty());
        Ok(())
    }

    #[test]
    fn the_one_where_the_sink_table_went_missing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config_path = write_test_config(dir.path(), "[stream]\nname = \"S\"\n")?;
        let error = load_config(Some(config_path.as_path())).expect_err("no [sink]");
        assert!(error.to_string().contains("Failed to parse configuration"));
        Ok(())
    }
}
