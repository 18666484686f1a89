//! 🗄️ Named relational sources for query mode.
//!
//! The host used to hand out pooled connections by name. Here the "pool" is a table of
//! SQLite files from configuration, and every query gets a brand-new connection that is
//! closed before the call returns. Pooling is somebody else's hobby.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;
use tracing::debug;

/// 📦 `[datasources.<name>]` in the config file.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DataSourceConfig {
    pub path: PathBuf,
    /// Open without write access. Reports only read, so this is mostly a seatbelt.
    #[serde(default)]
    pub read_only: bool,
}

/// 🔌 One named source, able to open connections on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    name: String,
    config: DataSourceConfig,
}

impl DataSource {
    pub fn new(name: impl Into<String>, config: DataSourceConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 🔌 Open a fresh connection. The caller owns it and must close it.
    pub fn connect(&self) -> Result<Connection> {
        let flags = if self.config.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };
        debug!(
            "🔌 opening datasource '{}' at {}",
            self.name,
            self.config.path.display()
        );
        Connection::open_with_flags(&self.config.path, flags).with_context(|| {
            format!("Cannot create connection from datasource '{}'.", self.name)
        })
    }
}

/// 📇 Name → source lookup, built once from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceRegistry {
    sources: BTreeMap<String, DataSourceConfig>,
}

impl DataSourceRegistry {
    pub fn new(sources: BTreeMap<String, DataSourceConfig>) -> Self {
        Self { sources }
    }

    pub fn lookup(&self, name: &str) -> Option<DataSource> {
        self.sources
            .get(name)
            .map(|config| DataSource::new(name, config.clone()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}
