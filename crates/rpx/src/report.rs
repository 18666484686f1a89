//! 🏗️ The report model: the blueprint the renderer builds pages from.
//!
//! 🎬 *[an architect unrolls a blueprint. it says "Volume" in a column header. nobody claps.]*
//!
//! A [`ReportModel`] collects everything a renderer needs that isn't row data:
//! metadata, registered fields, column definitions, an optional chart, and (in query
//! mode) the sub-reports concatenated under a parent. It is assembled once per
//! invocation and thrown away after rendering.
//!
//! ⚠️ Models are write-once. Registering the same field twice is an error, not an
//! upsert. If you need a fresh schema, you need a fresh model. 🦆

mod builder;

pub use builder::ReportSchemaBuilder;

use std::path::PathBuf;

use thiserror::Error;

use crate::chart::ChartBinding;
use crate::schema::ColumnType;
use crate::style::{ConditionalStyle, HeaderStyle, TableStyle};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("field '{0}' is already registered on report '{1}'")]
    DuplicateField(String, String),
    #[error("sub-report '{0}' is already concatenated into report '{1}'")]
    DuplicateSubreport(String, String),
}

/// 📰 Title block text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportMetadata {
    pub title: String,
    pub subtitle: String,
    pub description: String,
}

/// 🖼️ Banner images. Header rides along as the `headerImage` parameter, footer on the page layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLayout {
    pub header_image: Option<PathBuf>,
    pub footer_image: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportField {
    pub name: String,
    pub column_type: ColumnType,
}

/// 📐 One column definition as the renderer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportColumn {
    pub property: String,
    pub column_type: ColumnType,
    pub title: String,
    pub width: u32,
    pub header_style: HeaderStyle,
    pub conditional_style: Option<ConditionalStyle>,
}

/// 🔗 A handle on a column, as handed out by data providers for chart binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub index: usize,
    pub name: String,
    pub title: String,
    pub column_type: ColumnType,
}

/// 🧩 A child report concatenated under a parent. Its rows travel as a named parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Subreport {
    pub name: String,
    pub model: ReportModel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportModel {
    pub name: String,
    pub metadata: ReportMetadata,
    pub layout: PageLayout,
    fields: Vec<ReportField>,
    columns: Vec<ReportColumn>,
    table_style: Option<TableStyle>,
    chart: Option<ChartBinding>,
    subreports: Vec<Subreport>,
}

impl ReportModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: ReportMetadata::default(),
            layout: PageLayout::default(),
            fields: Vec::new(),
            columns: Vec::new(),
            table_style: None,
            chart: None,
            subreports: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: ReportMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_layout(mut self, layout: PageLayout) -> Self {
        self.layout = layout;
        self
    }

    /// 📝 Register a data field. Once per name, per model, forever.
    pub fn register_field(
        &mut self,
        name: impl Into<String>,
        column_type: ColumnType,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if self.fields.iter().any(|field| field.name == name) {
            return Err(ModelError::DuplicateField(name, self.name.clone()));
        }
        self.fields.push(ReportField { name, column_type });
        Ok(())
    }

    pub fn define_column(&mut self, column: ReportColumn) {
        self.columns.push(column);
    }

    pub fn fields(&self) -> &[ReportField] {
        &self.fields
    }

    pub fn columns(&self) -> &[ReportColumn] {
        &self.columns
    }

    /// 🧾 Lay the defined columns out as a plain table, with the house table style.
    pub fn show_as_table(&mut self) {
        self.table_style = Some(TableStyle::default());
    }

    /// Some when the columns are laid out as a table; charts-only reports keep this None.
    pub fn table_style(&self) -> Option<&TableStyle> {
        self.table_style.as_ref()
    }

    pub fn set_chart(&mut self, chart: ChartBinding) {
        self.chart = Some(chart);
    }

    pub fn chart(&self) -> Option<&ChartBinding> {
        self.chart.as_ref()
    }

    /// 🧩 Concatenate a child report after whatever this report already holds.
    pub fn add_subreport(&mut self, subreport: Subreport) -> Result<(), ModelError> {
        if self.subreports.iter().any(|existing| existing.name == subreport.name) {
            return Err(ModelError::DuplicateSubreport(subreport.name, self.name.clone()));
        }
        self.subreports.push(subreport);
        Ok(())
    }

    pub fn subreports(&self) -> &[Subreport] {
        &self.subreports
    }
}
