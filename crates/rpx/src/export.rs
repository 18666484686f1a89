//! 💾 Exporters: a rendered document goes in, bytes for a file come out.
//!
//! 🎬 *[the document is paginated, styled, and proud. then somebody asks for CSV.]*
//!
//! Each [`OutputFormat`] maps to one exporter behind the [`Exporter`] trait, dispatched through
//! [`ExporterBackend`] so the router never has to know which codec it is holding. Exporters
//! are pure: bytes out, no disk. Writing is the router's job.
//!
//! 📝 XLS and XLSX both come out as SpreadsheetML 2003 XML, which every spreadsheet program
//! in living memory opens without complaint. The file extension still follows the format.

mod csv;
mod pdf;
mod spreadsheet;

pub use csv::CsvExporter;
pub use pdf::PdfExporter;
pub use spreadsheet::SpreadsheetExporter;

use std::fmt::{self, Debug};
use std::str::FromStr;

use anyhow::Result;

use crate::render::RenderedDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Pdf,
    Xls,
    Xlsx,
    Csv,
}

impl OutputFormat {
    /// The extension appended to the output path. Lower case, no dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Xls => "xls",
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOutputFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownOutputFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "xls" => Ok(OutputFormat::Xls),
            "xlsx" => Ok(OutputFormat::Xlsx),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(UnknownOutputFormat(s.to_string())),
        }
    }
}

/// 💾 Turns a rendered document into file contents.
pub trait Exporter: Debug + Send + Sync {
    fn export(&self, document: &RenderedDocument) -> Result<Vec<u8>>;
}

/// 🎭 One exporter per format, dispatched by match. Same trick as the source/sink backends.
#[derive(Debug)]
pub enum ExporterBackend {
    Csv(CsvExporter),
    Pdf(PdfExporter),
    Spreadsheet(SpreadsheetExporter),
}

impl ExporterBackend {
    pub fn from_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => ExporterBackend::Csv(CsvExporter),
            OutputFormat::Pdf => ExporterBackend::Pdf(PdfExporter),
            OutputFormat::Xls | OutputFormat::Xlsx => {
                ExporterBackend::Spreadsheet(SpreadsheetExporter)
            }
        }
    }
}

impl Exporter for ExporterBackend {
    fn export(&self, document: &RenderedDocument) -> Result<Vec<u8>> {
        match self {
            ExporterBackend::Csv(exporter) => exporter.export(document),
            ExporterBackend::Pdf(exporter) => exporter.export(document),
            ExporterBackend::Spreadsheet(exporter) => exporter.export(document),
        }
    }
}
