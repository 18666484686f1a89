//! 📈 Chart selection: table, pie, bar or line, and which columns feed it.
//!
//! 🎬 *[the config says "bar". the config says nothing else. the first two columns
//! look at each other nervously.]*
//!
//! Shared by every assembly mode. A table chart lays the columns out as a styled table and
//! attaches no chart. Pie, bar and line bind a category and a series column: by name when
//! both names are given, by position (0 and 1) otherwise.
//!
//! Axis labels come from the bound columns' display titles, except for a line chart bound by
//! name, which labels its axes with the names exactly as configured. Inconsistent? Yes.
//! Observed, kept, and tested so nobody "fixes" it by accident. 🦆

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::providers::DataProvider;
use crate::report::{ColumnRef, ReportModel};
use crate::schema::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Table,
    Pie,
    Bar,
    Line,
}

impl ChartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Table => "table",
            ChartKind::Pie => "pie",
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised chart name. Carries the offending text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChartKind(pub String);

impl FromStr for ChartKind {
    type Err = UnknownChartKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(ChartKind::Table),
            "pie" => Ok(ChartKind::Pie),
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            _ => Err(UnknownChartKind(s.to_string())),
        }
    }
}

/// 🔗 The category and series a chart is drawn from, plus its labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartBinding {
    pub kind: ChartKind,
    pub title: String,
    pub category_column: ColumnRef,
    pub series_column: ColumnRef,
    /// None for pie charts, which have no axes to label.
    pub category_axis_label: Option<String>,
    pub value_axis_label: Option<String>,
}

/// 📝 What the configuration asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRequest<'a> {
    pub kind: ChartKind,
    pub title: &'a str,
    pub category: Option<&'a str>,
    pub series: Option<&'a str>,
}

/// 🎨 Apply the chart policy to a model whose columns are already registered.
pub fn apply_chart(
    request: &ChartRequest<'_>,
    provider: &dyn DataProvider,
    model: &mut ReportModel,
) -> Result<(), SchemaError> {
    if request.kind == ChartKind::Table {
        model.show_as_table();
        debug!("🧾 '{}' laid out as a table", model.name);
        return Ok(());
    }

    let explicit = match (request.category, request.series) {
        (Some(category), Some(series)) if !category.is_empty() && !series.is_empty() => {
            Some((category, series))
        }
        _ => None,
    };

    let (category_column, series_column) = match explicit {
        Some((category, series)) => (
            provider.category_column(Some(category))?,
            provider.series_column(Some(series))?,
        ),
        None => (provider.category_column(None)?, provider.series_column(None)?),
    };

    let (category_axis_label, value_axis_label) = match (request.kind, explicit) {
        (ChartKind::Pie, _) => (None, None),
        (ChartKind::Line, Some((category, series))) => {
            (Some(category.to_string()), Some(series.to_string()))
        }
        _ => (
            Some(category_column.title.clone()),
            Some(series_column.title.clone()),
        ),
    };

    debug!(
        "📈 {} chart on '{}': category '{}', series '{}'",
        request.kind, model.name, category_column.name, series_column.name
    );
    model.set_chart(ChartBinding {
        kind: request.kind,
        title: request.title.to_string(),
        category_column,
        series_column,
        category_axis_label,
        value_axis_label,
    });
    Ok(())
}
