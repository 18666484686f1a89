use anyhow::{Result, bail};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::ASCII_FULL};
use tracing::{debug, trace};

use crate::common::{Record, Value};
use crate::render::{
    ChartBlock, DESCRIPTION, HEADER_IMAGE, Page, RenderRequest, RenderedDocument, ReportParameters,
    ReportRenderer, SUBTITLE, Section, TITLE, TableBlock,
};
use crate::report::ReportModel;
use crate::schema::capitalize;
use crate::style::HorizontalAlign;
use crate::template::{CompiledTemplate, substitute_parameters};

/// 📏 Table rows per page before the renderer turns the page.
pub const ROWS_PER_PAGE: usize = 40;

// -- characters per laid-out line. fits a monospaced A4 page at 8pt.
const LINE_WIDTH: u16 = 110;

/// 🖨️ Renders into plain-text-friendly sections, laid out with `comfy-table`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl ReportRenderer for TextRenderer {
    fn render(&self, request: RenderRequest<'_>) -> Result<RenderedDocument> {
        match request {
            RenderRequest::Dynamic {
                model,
                rows,
                parameters,
            } => render_dynamic(model, rows, parameters),
            RenderRequest::Template {
                template,
                parameters,
            } => render_template(template, parameters),
        }
    }
}

fn render_dynamic(
    model: &ReportModel,
    rows: &[Record],
    parameters: &ReportParameters,
) -> Result<RenderedDocument> {
    let mut pages = Paginator::default();
    pages.push(Section::Heading(
        parameters
            .scalar(TITLE)
            .unwrap_or(model.metadata.title.as_str())
            .to_string(),
    ));
    for key in [SUBTITLE, DESCRIPTION] {
        if let Some(text) = parameters.scalar(key).filter(|text| !text.is_empty()) {
            pages.push(Section::Text(text.to_string()));
        }
    }
    if let Some(image) = parameters.scalar(HEADER_IMAGE) {
        pages.push(Section::Image(image.into()));
    }

    render_body(model, rows, &mut pages)?;
    for subreport in model.subreports() {
        let sub_rows = parameters.dataset(&subreport.name).unwrap_or_default();
        trace!(
            "🧩 rendering sub-report '{}' with {} row(s)",
            subreport.name,
            sub_rows.len()
        );
        render_body(&subreport.model, sub_rows, &mut pages)?;
    }

    let document = RenderedDocument {
        name: model.name.clone(),
        pages: pages.finish(),
        footer_image: model.layout.footer_image.clone(),
    };
    debug!(
        "🖨️ rendered '{}' into {} page(s)",
        document.name,
        document.pages.len()
    );
    Ok(document)
}

fn render_body(model: &ReportModel, rows: &[Record], pages: &mut Paginator) -> Result<()> {
    if let Some(chart) = model.chart() {
        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            let series = row.get(&chart.series_column.name).unwrap_or(&Value::Null);
            if series.is_null() {
                continue;
            }
            let Some(number) = series.as_f64() else {
                bail!("Failed to generate the report. Provide a numeric series column.");
            };
            let category = row
                .get(&chart.category_column.name)
                .map(Value::to_string)
                .unwrap_or_default();
            points.push((category, number));
        }
        pages.push(Section::Chart(ChartBlock {
            kind: chart.kind,
            title: chart.title.clone(),
            category_label: chart.category_axis_label.clone(),
            value_label: chart.value_axis_label.clone(),
            points,
        }));
    }

    if model.table_style().is_some() {
        let columns = model.columns();
        let block = TableBlock {
            caption: None,
            headers: columns.iter().map(|column| column.title.clone()).collect(),
            header_alignments: columns.iter().map(|column| column.header_style.align).collect(),
            cell_styles: columns.iter().map(|column| column.conditional_style).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|column| row.get(&column.property).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .collect(),
            striped: true,
        };
        pages.push_table(block);
    }
    Ok(())
}

fn render_template(
    template: &CompiledTemplate,
    parameters: &ReportParameters,
) -> Result<RenderedDocument> {
    let mut pages = Paginator::default();
    for text in template.text_elements() {
        let filled = substitute_parameters(text, |name| parameters.scalar(name).map(str::to_string));
        pages.push(Section::Text(filled));
    }

    for slot in template.dataset_slots() {
        let Some(rows) = parameters.dataset(&slot.name) else {
            trace!("🕳️ dataset slot '{}' left empty", slot.name);
            continue;
        };
        let names: Vec<String> = rows
            .first()
            .map(|first| first.keys().map(str::to_string).collect())
            .unwrap_or_default();
        pages.push_table(TableBlock {
            caption: Some(slot.name.clone()),
            headers: names.iter().map(|name| capitalize(name)).collect(),
            header_alignments: vec![HorizontalAlign::Center; names.len()],
            cell_styles: vec![None; names.len()],
            rows: rows
                .iter()
                .map(|row| {
                    names
                        .iter()
                        .map(|name| row.get(name).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .collect(),
            striped: false,
        });
    }

    Ok(RenderedDocument {
        name: template.name().to_string(),
        pages: pages.finish(),
        footer_image: None,
    })
}

// -- 📄 page turner. tables break every ROWS_PER_PAGE rows; everything else rides along.
#[derive(Debug, Default)]
struct Paginator {
    done: Vec<Page>,
    current: Page,
    rows_on_page: usize,
}

impl Paginator {
    fn push(&mut self, section: Section) {
        self.current.sections.push(section);
    }

    fn push_table(&mut self, block: TableBlock) {
        if block.rows.is_empty() {
            self.push(Section::Table(block));
            return;
        }
        for chunk in block.rows.chunks(ROWS_PER_PAGE) {
            if self.rows_on_page + chunk.len() > ROWS_PER_PAGE {
                self.turn();
            }
            self.rows_on_page += chunk.len();
            self.push(Section::Table(TableBlock {
                rows: chunk.to_vec(),
                ..block.clone()
            }));
        }
    }

    fn turn(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
        self.rows_on_page = 0;
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.sections.is_empty() || self.done.is_empty() {
            self.turn();
        }
        self.done
    }
}

/// 📝 Lay a page out as text lines. Used by exporters that want words, not cells.
pub fn page_lines(page: &Page) -> Vec<String> {
    let mut lines = Vec::new();
    for section in &page.sections {
        match section {
            Section::Heading(text) => {
                lines.push(text.clone());
                lines.push("=".repeat(text.chars().count()));
            }
            Section::Text(text) => lines.extend(text.lines().map(str::to_string)),
            Section::Image(path) => lines.push(format!("[image: {}]", path.display())),
            Section::Table(table) => {
                if let Some(caption) = &table.caption {
                    lines.push(caption.clone());
                }
                lines.extend(table_text(table).lines().map(str::to_string));
            }
            Section::Chart(chart) => lines.extend(chart_lines(chart)),
        }
        lines.push(String::new());
    }
    lines
}

fn table_text(block: &TableBlock) -> String {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(LINE_WIDTH)
        .set_header(
            block
                .headers
                .iter()
                .zip(&block.header_alignments)
                .map(|(header, align)| Cell::new(header).set_alignment(cell_alignment(*align))),
        );
    for row in &block.rows {
        table.add_row(row.iter().enumerate().map(|(column, value)| {
            Cell::new(value.to_string())
                .set_alignment(cell_alignment(block.cell_alignment(column, value)))
        }));
    }
    table.to_string()
}

fn chart_lines(chart: &ChartBlock) -> Vec<String> {
    let mut lines = vec![format!("{} chart: {}", chart.kind, chart.title)];
    if let (Some(category), Some(value)) = (&chart.category_label, &chart.value_label) {
        lines.push(format!("{category} / {value}"));
    }
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    for (category, value) in &chart.points {
        table.add_row(vec![
            Cell::new(category),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    lines.extend(table.to_string().lines().map(str::to_string));
    lines
}

fn cell_alignment(align: HorizontalAlign) -> CellAlignment {
    match align {
        HorizontalAlign::Left => CellAlignment::Left,
        HorizontalAlign::Center => CellAlignment::Center,
        HorizontalAlign::Right => CellAlignment::Right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartKind, ChartRequest, apply_chart};
    use crate::providers::EventDataProvider;
    use crate::report::{ReportMetadata, Subreport};

    fn model_for(provider: &EventDataProvider, kind: ChartKind) -> anyhow::Result<ReportModel> {
        let mut model = ReportModel::new("stocks").with_metadata(ReportMetadata {
            title: "Stocks".into(),
            ..ReportMetadata::default()
        });
        provider.bind_to(&mut model)?;
        apply_chart(
            &ChartRequest {
                kind,
                title: "",
                category: None,
                series: None,
            },
            provider,
            &mut model,
        )?;
        Ok(model)
    }

    fn batch(count: usize) -> String {
        let events: Vec<String> = (0..count)
            .map(|i| format!(r#"{{"event":{{"symbol":"S{i}","volume":{i}}}}}"#))
            .collect();
        format!("[{}]", events.join(","))
    }

    #[test]
    fn the_one_where_ninety_rows_take_three_pages() -> anyhow::Result<()> {
        let provider = EventDataProvider::parse(&batch(90))?;
        let model = model_for(&provider, ChartKind::Table)?;
        let document = TextRenderer.render(RenderRequest::Dynamic {
            model: &model,
            rows: provider.rows(),
            parameters: &ReportParameters::new(),
        })?;
        assert_eq!(document.pages.len(), 3);
        let counts: Vec<usize> = document.tables().map(|t| t.rows.len()).collect();
        assert_eq!(counts, vec![40, 40, 10]);
        assert!(matches!(&document.pages[0].sections[0], Section::Heading(title) if title == "Stocks"));
        Ok(())
    }

    #[test]
    fn the_one_where_a_string_series_is_caught_at_render_time() -> anyhow::Result<()> {
        let provider = EventDataProvider::parse(r#"[{"event":{"volume":1,"symbol":"WSO2"}}]"#)?;
        let model = model_for(&provider, ChartKind::Bar)?;
        let err = TextRenderer
            .render(RenderRequest::Dynamic {
                model: &model,
                rows: provider.rows(),
                parameters: &ReportParameters::new(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("Provide a numeric series column"));
        Ok(())
    }

    #[test]
    fn the_one_where_charts_become_points() -> anyhow::Result<()> {
        let provider = EventDataProvider::parse(&batch(3))?;
        let model = model_for(&provider, ChartKind::Line)?;
        let document = TextRenderer.render(RenderRequest::Dynamic {
            model: &model,
            rows: provider.rows(),
            parameters: &ReportParameters::new(),
        })?;
        let chart = document.charts().next().expect("one chart");
        assert_eq!(chart.points, vec![
                ("S0".to_string(), 0.0),
                ("S1".to_string(), 1.0),
                ("S2".to_string(), 2.0)
            ]);
        assert_eq!(document.tables().count(), 0);
        Ok(())
    }

    #[test]
    fn the_one_where_subreports_read_their_rows_from_parameters() -> anyhow::Result<()> {
        let provider = EventDataProvider::parse(&batch(2))?;
        let child = model_for(&provider, ChartKind::Table)?;
        let mut parent = ReportModel::new("parent");
        parent.add_subreport(Subreport {
            name: "first".into(),
            model: child,
        })?;
        let mut parameters = ReportParameters::new();
        parameters.set_dataset("first", provider.rows().to_vec());
        let document = TextRenderer.render(RenderRequest::Dynamic {
            model: &parent,
            rows: &[],
            parameters: &parameters,
        })?;
        assert_eq!(document.tables().map(|t| t.rows.len()).sum::<usize>(), 2);
        Ok(())
    }

    #[test]
    fn the_one_where_templates_fill_text_and_slots() -> anyhow::Result<()> {
        let template = CompiledTemplate::compile(
            std::path::Path::new("t.jrxml"),
            r#"<jasperReport name="T">
                <parameter name="rows" class="net.sf.jasperreports.engine.JRDataSource"/>
                <textFieldExpression><![CDATA[$P{title}]]></textFieldExpression>
            </jasperReport>"#,
        )?;
        let provider = EventDataProvider::parse(&batch(2))?;
        let mut parameters = ReportParameters::new();
        parameters.set_scalar(TITLE, "Filled");
        parameters.set_dataset("rows", provider.rows().to_vec());
        let document = TextRenderer.render(RenderRequest::Template {
            template: &template,
            parameters: &parameters,
        })?;
        assert_eq!(document.pages[0].sections[0], Section::Text("Filled".into()));
        let table = document.tables().next().expect("slot table");
        assert_eq!(table.headers, vec!["Symbol".to_string(), "Volume".to_string()]);
        assert_eq!(table.caption.as_deref(), Some("rows"));
        Ok(())
    }

    #[test]
    fn the_one_where_pages_read_like_text() -> anyhow::Result<()> {
        let provider = EventDataProvider::parse(&batch(1))?;
        let model = model_for(&provider, ChartKind::Table)?;
        let document = TextRenderer.render(RenderRequest::Dynamic {
            model: &model,
            rows: provider.rows(),
            parameters: &ReportParameters::new(),
        })?;
        let text = page_lines(&document.pages[0]).join("\n");
        assert!(text.contains("Stocks"));
        assert!(text.contains("Volume"));
        assert!(text.contains("S0"));
        Ok(())
    }
}
