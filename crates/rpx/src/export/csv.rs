use anyhow::Result;

use crate::export::Exporter;
use crate::render::{RenderedDocument, Section};

/// 📊 Tables and chart points as RFC 4180 CSV. Headings and images do not survive the trip.
///
/// A table split across pages is written once with one header row. A new table, or a chart,
/// starts after a blank line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn export(&self, document: &RenderedDocument) -> Result<Vec<u8>> {
        let mut out = String::new();
        let mut last_headers: Option<&[String]> = None;

        for section in document.pages.iter().flat_map(|page| page.sections.iter()) {
            match section {
                Section::Table(table) => {
                    if last_headers != Some(table.headers.as_slice()) {
                        if !out.is_empty() {
                            out.push('\n');
                        }
                        push_record(&mut out, table.headers.iter().map(String::as_str));
                        last_headers = Some(table.headers.as_slice());
                    }
                    for row in &table.rows {
                        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
                        push_record(&mut out, cells.iter().map(String::as_str));
                    }
                }
                Section::Chart(chart) => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    let category = chart.category_label.as_deref().unwrap_or("category");
                    let value = chart.value_label.as_deref().unwrap_or("value");
                    push_record(&mut out, [category, value].into_iter());
                    for (category, value) in &chart.points {
                        let value = value.to_string();
                        push_record(&mut out, [category.as_str(), value.as_str()].into_iter());
                    }
                    last_headers = None;
                }
                Section::Heading(_) | Section::Text(_) | Section::Image(_) => {}
            }
        }
        Ok(out.into_bytes())
    }
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape(field));
    }
    out.push_str("\r\n");
}

// -- 🧯 quote only when the field would otherwise break the record
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
