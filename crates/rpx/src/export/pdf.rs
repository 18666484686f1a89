use std::fmt::Write as _;

use anyhow::Result;

use crate::export::Exporter;
use crate::render::{RenderedDocument, page_lines};

// -- 📐 A4 in points, one monospaced font, one line every LEADING points
const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 30;
const FONT_SIZE: u32 = 8;
const LEADING: u32 = 10;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN - 2 * LEADING) / LEADING) as usize;

/// 📄 A minimal PDF 1.4: Courier text, one or more PDF pages per rendered page.
///
/// Not pretty. Opens everywhere. The rendered pages are laid out as text first, and a rendered
/// page that runs longer than a sheet spills onto the next sheet rather than off the bottom.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExporter;

impl Exporter for PdfExporter {
    fn export(&self, document: &RenderedDocument) -> Result<Vec<u8>> {
        let mut sheets: Vec<Vec<String>> = Vec::new();
        for page in &document.pages {
            let lines = page_lines(page);
            if lines.is_empty() {
                sheets.push(Vec::new());
            }
            sheets.extend(lines.chunks(LINES_PER_PAGE).map(<[String]>::to_vec));
        }
        if sheets.is_empty() {
            sheets.push(Vec::new());
        }

        let footer = document
            .footer_image
            .as_ref()
            .map(|path| format!("[footer: {}]", path.display()));

        let mut writer = PdfWriter::default();
        let kids: Vec<String> = (0..sheets.len())
            .map(|index| format!("{} 0 R", page_object_id(index)))
            .collect();
        writer.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        writer.object(
            2,
            &format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                sheets.len()
            ),
        );
        writer.object(3, "<< /Type /Font /Subtype /Type1 /BaseFont /Courier >>");
        for (index, lines) in sheets.iter().enumerate() {
            let content = content_stream(lines, footer.as_deref());
            writer.object(
                page_object_id(index),
                &format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                     /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                    page_object_id(index) + 1
                ),
            );
            writer.object(
                page_object_id(index) + 1,
                &format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
            );
        }
        Ok(writer.finish())
    }
}

fn page_object_id(index: usize) -> usize {
    4 + 2 * index
}

fn content_stream(lines: &[String], footer: Option<&str>) -> String {
    let mut stream = String::new();
    let _ = write!(
        stream,
        "BT\n/F1 {FONT_SIZE} Tf\n{LEADING} TL\n{MARGIN} {} Td\n",
        PAGE_HEIGHT - MARGIN - LEADING
    );
    for line in lines {
        let _ = writeln!(stream, "({}) Tj T*", escape(line));
    }
    stream.push_str("ET");
    if let Some(footer) = footer {
        let _ = write!(
            stream,
            "\nBT\n/F1 {FONT_SIZE} Tf\n{MARGIN} {MARGIN} Td\n({}) Tj\nET",
            escape(footer)
        );
    }
    stream
}

// -- 🧯 PDF string literals: backslash-escape the delimiters, and Courier only speaks ASCII
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}

// -- ✍️ objects are written in id order, so the xref table is just the offsets in sequence
#[derive(Debug, Default)]
struct PdfWriter {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn object(&mut self, id: usize, body: &str) {
        if self.out.is_empty() {
            self.out.extend_from_slice(b"%PDF-1.4\n");
        }
        self.offsets.push(self.out.len());
        self.out
            .extend_from_slice(format!("{id} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.out.len();
        let mut trailer = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            let _ = writeln!(trailer, "{offset:010} 00000 n ");
        }
        let _ = write!(
            trailer,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            self.offsets.len() + 1
        );
        self.out.extend_from_slice(trailer.as_bytes());
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Page, Section};

    fn document(lines: usize) -> RenderedDocument {
        RenderedDocument {
            name: "pdf".into(),
            pages: vec![Page {
                sections: (0..lines)
                    .map(|i| Section::Text(format!("line (#{i})")))
                    .collect(),
            }],
            footer_image: Some("footer.png".into()),
        }
    }

    #[test]
    fn the_one_where_the_pdf_has_a_head_and_a_tail() -> anyhow::Result<()> {
        let bytes = PdfExporter.export(&document(3))?;
        let text = String::from_utf8(bytes)?;
        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/Count 1"));
        assert!(text.contains(r"(line \(#0\)) Tj T*"));
        assert!(text.contains("[footer: footer.png]"));
        Ok(())
    }

    #[test]
    fn the_one_where_long_pages_spill_onto_more_sheets() -> anyhow::Result<()> {
        // -- every Text section is two lines: the text and a spacer
        let bytes = PdfExporter.export(&document(LINES_PER_PAGE))?;
        let text = String::from_utf8(bytes)?;
        assert!(text.contains("/Count 2"));
        Ok(())
    }

    #[test]
    fn the_one_where_the_xref_points_at_real_objects() -> anyhow::Result<()> {
        let bytes = PdfExporter.export(&document(1))?;
        let text = String::from_utf8(bytes)?;
        let xref_start = text.find("xref\n").expect("xref table");
        let first_entry = text[xref_start..]
            .lines()
            .nth(3)
            .expect("object 1 entry")
            .trim()
            .split(' ')
            .next()
            .expect("offset")
            .parse::<usize>()?;
        assert!(text[first_entry..].starts_with("1 0 obj"));
        Ok(())
    }

    #[test]
    fn the_one_where_unicode_is_politely_replaced() {
        assert_eq!(escape("café \\ ok"), "caf? \\\\ ok");
    }
}
