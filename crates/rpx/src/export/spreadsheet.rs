use std::fmt::Write as _;

use anyhow::Result;

use crate::common::Value;
use crate::export::Exporter;
use crate::render::{RenderedDocument, Section};
use crate::style::{HEADER_BACKGROUND, HEADER_TEXT, ODD_ROW_BACKGROUND};

const SHEET_NAME_LIMIT: usize = 31;

/// 📗 SpreadsheetML 2003: one worksheet, typed cells, the house header and odd-row colours.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetExporter;

impl Exporter for SpreadsheetExporter {
    fn export(&self, document: &RenderedDocument) -> Result<Vec<u8>> {
        let mut xml = String::new();
        let _ = write!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <?mso-application progid=\"Excel.Sheet\"?>\n\
             <Workbook xmlns=\"urn:schemas-microsoft-com:office:spreadsheet\" \
             xmlns:ss=\"urn:schemas-microsoft-com:office:spreadsheet\">\n\
             <Styles>\n\
             <Style ss:ID=\"header\"><Font ss:Bold=\"1\" ss:Color=\"{HEADER_TEXT}\"/>\
             <Interior ss:Color=\"{HEADER_BACKGROUND}\" ss:Pattern=\"Solid\"/></Style>\n\
             <Style ss:ID=\"odd\"><Interior ss:Color=\"{ODD_ROW_BACKGROUND}\" ss:Pattern=\"Solid\"/></Style>\n\
             <Style ss:ID=\"title\"><Font ss:Bold=\"1\" ss:Size=\"14\"/></Style>\n\
             </Styles>\n\
             <Worksheet ss:Name=\"{}\">\n<Table>\n",
            escape(&sheet_name(&document.name))
        );

        let mut last_headers: Option<&[String]> = None;
        let mut striped_row = 0usize;
        for section in document.pages.iter().flat_map(|page| page.sections.iter()) {
            match section {
                Section::Heading(text) => string_row(&mut xml, text, Some("title")),
                Section::Text(text) => string_row(&mut xml, text, None),
                Section::Image(path) => {
                    string_row(&mut xml, &format!("[image: {}]", path.display()), None)
                }
                Section::Table(table) => {
                    if last_headers != Some(table.headers.as_slice()) {
                        header_row(&mut xml, &table.headers);
                        last_headers = Some(table.headers.as_slice());
                        striped_row = 0;
                    }
                    for row in &table.rows {
                        striped_row += 1;
                        let style = (table.striped && striped_row % 2 == 1).then_some("odd");
                        value_row(&mut xml, row, style);
                    }
                }
                Section::Chart(chart) => {
                    last_headers = None;
                    string_row(&mut xml, &chart.title, Some("title"));
                    header_row(
                        &mut xml,
                        &[
                            chart.category_label.clone().unwrap_or_else(|| "Category".into()),
                            chart.value_label.clone().unwrap_or_else(|| "Value".into()),
                        ],
                    );
                    for (category, value) in &chart.points {
                        xml.push_str("<Row>");
                        cell(&mut xml, "String", &escape(category), None);
                        cell(&mut xml, "Number", &value.to_string(), None);
                        xml.push_str("</Row>\n");
                    }
                }
            }
        }

        xml.push_str("</Table>\n</Worksheet>\n</Workbook>\n");
        Ok(xml.into_bytes())
    }
}

fn string_row(xml: &mut String, text: &str, style: Option<&str>) {
    xml.push_str("<Row>");
    cell(xml, "String", &escape(text), style);
    xml.push_str("</Row>\n");
}

fn header_row(xml: &mut String, headers: &[String]) {
    xml.push_str("<Row>");
    for header in headers {
        cell(xml, "String", &escape(header), Some("header"));
    }
    xml.push_str("</Row>\n");
}

fn value_row(xml: &mut String, row: &[Value], style: Option<&str>) {
    xml.push_str("<Row>");
    for value in row {
        match value {
            Value::Null => match style {
                Some(style) => {
                    let _ = write!(xml, "<Cell ss:StyleID=\"{style}\"/>");
                }
                None => xml.push_str("<Cell/>"),
            },
            Value::Bool(flag) => cell(xml, "Boolean", if *flag { "1" } else { "0" }, style),
            Value::String(text) => cell(xml, "String", &escape(text), style),
            number => cell(xml, "Number", &number.to_string(), style),
        }
    }
    xml.push_str("</Row>\n");
}

fn cell(xml: &mut String, kind: &str, data: &str, style: Option<&str>) {
    match style {
        Some(style) => {
            let _ = write!(
                xml,
                "<Cell ss:StyleID=\"{style}\"><Data ss:Type=\"{kind}\">{data}</Data></Cell>"
            );
        }
        None => {
            let _ = write!(xml, "<Cell><Data ss:Type=\"{kind}\">{data}</Data></Cell>");
        }
    }
}

// -- worksheet names: 31 chars max, and no []:*?/\ allowed
fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(SHEET_NAME_LIMIT)
        .collect();
    if cleaned.is_empty() {
        "Report".to_string()
    } else {
        cleaned
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
