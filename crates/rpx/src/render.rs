//! 🖨️ Rendering: the report model goes in, pages come out.
//!
//! 🎬 *[the model has columns. the rows have values. somebody has to put them on paper.
//! that somebody is a trait, because we like to keep our options open.]*
//!
//! [`ReportRenderer`] is the seam. Callers hand it a [`RenderRequest`] (a dynamic model with
//! rows, or a compiled template) plus [`ReportParameters`], and get back a paginated
//! [`RenderedDocument`] made of typed sections. Exporters turn that into bytes.
//!
//! The bundled [`TextRenderer`] paginates tables at a fixed row count and draws charts as a
//! category → value listing. It is also where a non-numeric series value gets caught, since
//! nobody can know the values until the rows are in hand.

mod text;

pub use text::{ROWS_PER_PAGE, TextRenderer, page_lines};

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;

use anyhow::Result;

use crate::chart::ChartKind;
use crate::common::{Record, Value};
use crate::report::ReportModel;
use crate::style::{ConditionalStyle, HorizontalAlign};
use crate::template::CompiledTemplate;

pub const TITLE: &str = "title";
pub const SUBTITLE: &str = "subtitle";
pub const DESCRIPTION: &str = "description";
pub const HEADER_IMAGE: &str = "headerImage";

/// 🎒 Named values and named row sets handed to the renderer alongside the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportParameters {
    scalars: BTreeMap<String, String>,
    datasets: Vec<(String, Vec<Record>)>,
}

impl ReportParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scalar(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.scalars.insert(name.into(), value.into());
    }

    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.scalars.get(name).map(String::as_str)
    }

    /// ➕ Attach a named row set. A repeated name replaces the earlier rows.
    pub fn set_dataset(&mut self, name: impl Into<String>, rows: Vec<Record>) {
        let name = name.into();
        match self.datasets.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = rows,
            None => self.datasets.push((name, rows)),
        }
    }

    pub fn dataset(&self, name: &str) -> Option<&[Record]> {
        self.datasets
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, rows)| rows.as_slice())
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().map(|(name, _)| name.as_str())
    }
}

/// 📨 What to render.
#[derive(Debug, Clone, Copy)]
pub enum RenderRequest<'a> {
    /// A model built at runtime, filled from `rows`.
    Dynamic {
        model: &'a ReportModel,
        rows: &'a [Record],
        parameters: &'a ReportParameters,
    },
    /// A compiled template, filled entirely from parameters.
    Template {
        template: &'a CompiledTemplate,
        parameters: &'a ReportParameters,
    },
}

/// 🧾 A run of table rows, with the per-column presentation the renderer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub caption: Option<String>,
    pub headers: Vec<String>,
    pub header_alignments: Vec<HorizontalAlign>,
    pub cell_styles: Vec<Option<ConditionalStyle>>,
    pub rows: Vec<Vec<Value>>,
    /// Shade every odd row. Only set for styled tables.
    pub striped: bool,
}

impl TableBlock {
    /// 🚦 A cell's alignment: its column rule's alignment when the rule matches, left otherwise.
    pub fn cell_alignment(&self, column: usize, value: &Value) -> HorizontalAlign {
        match self.cell_styles.get(column).copied().flatten() {
            Some(style) if style.matches(value) => style.align(),
            _ => HorizontalAlign::Left,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartBlock {
    pub kind: ChartKind,
    pub title: String,
    pub category_label: Option<String>,
    pub value_label: Option<String>,
    pub points: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Heading(String),
    Text(String),
    Image(PathBuf),
    Table(TableBlock),
    Chart(ChartBlock),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub sections: Vec<Section>,
}

/// 📄 The finished, paginated document, ready for an exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub name: String,
    pub pages: Vec<Page>,
    /// Footer banner, repeated on every page by exporters that know how.
    pub footer_image: Option<PathBuf>,
}

impl RenderedDocument {
    /// Every table block across every page, in order.
    pub fn tables(&self) -> impl Iterator<Item = &TableBlock> {
        self.pages
            .iter()
            .flat_map(|page| page.sections.iter())
            .filter_map(|section| match section {
                Section::Table(table) => Some(table),
                _ => None,
            })
    }

    pub fn charts(&self) -> impl Iterator<Item = &ChartBlock> {
        self.pages
            .iter()
            .flat_map(|page| page.sections.iter())
            .filter_map(|section| match section {
                Section::Chart(chart) => Some(chart),
                _ => None,
            })
    }
}

/// 🖨️ The renderer capability. Pure: no I/O, no state between calls.
pub trait ReportRenderer: Debug + Send + Sync {
    fn render(&self, request: RenderRequest<'_>) -> Result<RenderedDocument>;
}
