//! 🔌 Rows from a SQL query against a configured data source.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use tracing::{debug, trace, warn};

use crate::common::{Record, Value};
use crate::datasource::DataSource;
use crate::providers::DataProvider;
use crate::report::{ColumnRef, ModelError, ReportModel, ReportSchemaBuilder};
use crate::schema::{ColumnType, InferredColumn, SchemaError};

/// 🗄️ Rows from one relational query, typed by what the driver says about each column.
///
/// Built by [`QueryDataProvider::execute`], which opens a connection, runs the query to
/// completion and closes the connection before returning, on success and on failure.
/// Column lookups by name ignore case.
#[derive(Debug, Clone)]
pub struct QueryDataProvider {
    inferred: Vec<InferredColumn>,
    columns: Vec<ColumnRef>,
    lookup: HashMap<String, usize>,
    rows: Vec<Record>,
}

// -- 📋 what the statement reported before a single row came back
struct RawResult {
    names: Vec<String>,
    declared: Vec<Option<String>>,
    rows: Vec<Vec<SqlValue>>,
}

impl QueryDataProvider {
    /// 🚀 Run `query` against `source`. Any relational error fails the whole call.
    pub fn execute(source: &DataSource, query: &str) -> Result<Self> {
        let connection = source.connect()?;
        let outcome = run_query(&connection, query);
        if let Err((_, close_error)) = connection.close() {
            warn!(
                "🔌 cannot close connection to datasource '{}': {}",
                source.name(),
                close_error
            );
        }
        let raw = outcome.with_context(|| {
            format!(
                "Cannot retrieve records from datasource '{}'.",
                source.name()
            )
        })?;
        debug!(
            "🗄️ query on '{}' returned {} row(s) across {} column(s)",
            source.name(),
            raw.rows.len(),
            raw.names.len()
        );
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawResult) -> Result<Self> {
        let column_count = raw.names.len();
        let types: Vec<ColumnType> = (0..column_count)
            .map(|index| {
                raw.declared[index]
                    .as_deref()
                    .and_then(column_type_from_declared)
                    .unwrap_or_else(|| column_type_from_values(&raw.rows, index))
            })
            .collect();

        let inferred: Vec<InferredColumn> = raw
            .names
            .iter()
            .zip(&types)
            .map(|(name, column_type)| InferredColumn::new(name, *column_type, column_count))
            .collect();
        let columns: Vec<ColumnRef> = inferred
            .iter()
            .enumerate()
            .map(|(index, column)| ColumnRef {
                index,
                name: column.name.clone(),
                title: column.display_title.clone(),
                column_type: column.inferred_type,
            })
            .collect();
        let lookup = raw
            .names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.to_lowercase(), index))
            .collect();

        let mut rows = Vec::with_capacity(raw.rows.len());
        for raw_row in raw.rows {
            let mut record = Record::new();
            for (index, raw_value) in raw_row.into_iter().enumerate() {
                let name = &raw.names[index];
                record.insert(name.clone(), convert(name, raw_value, types[index])?);
            }
            trace!("🧾 row with {} value(s) converted", record.len());
            rows.push(record);
        }

        Ok(Self {
            inferred,
            columns,
            lookup,
            rows,
        })
    }

    pub fn inferred_columns(&self) -> &[InferredColumn] {
        &self.inferred
    }

    /// 🔨 Register the result schema on a model. Once per model.
    pub fn bind_to(&self, model: &mut ReportModel) -> Result<Vec<ColumnRef>, ModelError> {
        ReportSchemaBuilder::build(&self.inferred, model)
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }
}

impl DataProvider for QueryDataProvider {
    fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    fn column_named(&self, name: &str) -> Result<ColumnRef, SchemaError> {
        self.lookup
            .get(&name.to_lowercase())
            .and_then(|index| self.columns.get(*index))
            .cloned()
            .ok_or_else(|| SchemaError::UnknownColumn {
                name: name.to_string(),
            })
    }
}

fn run_query(connection: &Connection, query: &str) -> Result<RawResult> {
    let mut statement = connection.prepare(query)?;
    let (names, declared): (Vec<String>, Vec<Option<String>>) = statement
        .columns()
        .iter()
        .map(|column| {
            (
                column.name().to_string(),
                column.decl_type().map(str::to_string),
            )
        })
        .unzip();

    let mut rows = Vec::new();
    let mut result = statement.query([])?;
    while let Some(row) = result.next()? {
        let mut values = Vec::with_capacity(names.len());
        for index in 0..names.len() {
            values.push(row.get::<_, SqlValue>(index)?);
        }
        rows.push(values);
    }
    Ok(RawResult {
        names,
        declared,
        rows,
    })
}

/// 🏷️ Map a declared SQL column type onto a report column type, the JDBC way.
fn column_type_from_declared(declared: &str) -> Option<ColumnType> {
    let declared = declared.to_uppercase();
    if declared.contains("BIGINT") || declared.contains("LONG") {
        Some(ColumnType::Long)
    } else if declared.contains("INT") {
        Some(ColumnType::Integer)
    } else if declared.contains("BOOL") {
        Some(ColumnType::Boolean)
    } else if declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT") {
        Some(ColumnType::String)
    } else if declared.contains("REAL") {
        Some(ColumnType::Float)
    } else if declared.contains("FLOA")
        || declared.contains("DOUB")
        || declared.contains("DEC")
        || declared.contains("NUMERIC")
    {
        Some(ColumnType::Double)
    } else {
        None
    }
}

// -- 🔍 expressions and untyped columns: the first non-null value speaks for the column
fn column_type_from_values(rows: &[Vec<SqlValue>], index: usize) -> ColumnType {
    rows.iter()
        .filter_map(|row| row.get(index))
        .find_map(|value| match value {
            SqlValue::Null => None,
            SqlValue::Integer(_) => Some(ColumnType::Long),
            SqlValue::Real(_) => Some(ColumnType::Double),
            SqlValue::Text(_) | SqlValue::Blob(_) => Some(ColumnType::String),
        })
        .unwrap_or(ColumnType::String)
}

fn convert(name: &str, raw: SqlValue, column_type: ColumnType) -> Result<Value> {
    let value = match raw {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => match column_type {
            ColumnType::Integer => i32::try_from(i).map_or(Value::Long(i), Value::Int),
            ColumnType::Long => Value::Long(i),
            ColumnType::Float => Value::Float(i as f32),
            ColumnType::Double => Value::Double(i as f64),
            ColumnType::Boolean => Value::Bool(i != 0),
            ColumnType::String => Value::String(i.to_string()),
        },
        SqlValue::Real(f) => match column_type {
            ColumnType::Float => Value::Float(f as f32),
            ColumnType::Boolean => Value::Bool(f != 0.0),
            ColumnType::String => Value::String(f.to_string()),
            _ => Value::Double(f),
        },
        SqlValue::Text(text) => Value::String(text),
        SqlValue::Blob(_) => bail!("column '{name}' holds binary data, which a report cannot show"),
    };
    Ok(value)
}
