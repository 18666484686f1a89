//! 🚰 Data providers: "where do the rows come from?", answered twice.
//!
//! 🎬 *[two providers walk into a report. one brought JSON. the other brought SQL. the report
//! does not care. the report only wants columns.]*
//!
//! - [`EventDataProvider`] reads a parsed event batch and infers its schema from the first record.
//! - [`QueryDataProvider`] runs one relational query and takes column types from the driver.
//!
//! Both answer the same three questions through [`DataProvider`]: what are the columns, which
//! one is the category, which one is the series. When nobody names them, the answer is
//! "the first one" and "the second one", a positional contract older than most of us. 🦆

mod event;
mod query;

pub use event::{DatasetPartition, EventDataProvider};
pub use query::QueryDataProvider;

use crate::report::ColumnRef;
use crate::schema::SchemaError;

/// 🚰 The shared contract for row sources.
///
/// # Contract 📜
/// - `columns` is ordered. Order is layout, and layout is the positional default.
/// - `category_column(None)` is column 0, `series_column(None)` is column 1.
///   Fewer columns than that is `IndexOutOfRange`, not a shrug.
/// - Named lookups fail with `UnknownColumn`. Providers may widen the match
///   (the query provider ignores case).
pub trait DataProvider {
    fn columns(&self) -> &[ColumnRef];

    fn column_named(&self, name: &str) -> Result<ColumnRef, SchemaError> {
        self.columns()
            .iter()
            .find(|column| column.name == name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownColumn {
                name: name.to_string(),
            })
    }

    fn category_column(&self, name: Option<&str>) -> Result<ColumnRef, SchemaError> {
        match name {
            Some(name) => self.column_named(name),
            None => positional(self.columns(), 0),
        }
    }

    fn series_column(&self, name: Option<&str>) -> Result<ColumnRef, SchemaError> {
        match name {
            Some(name) => self.column_named(name),
            None => positional(self.columns(), 1),
        }
    }
}

fn positional(columns: &[ColumnRef], index: usize) -> Result<ColumnRef, SchemaError> {
    columns
        .get(index)
        .cloned()
        .ok_or(SchemaError::IndexOutOfRange {
            index,
            len: columns.len(),
        })
}
