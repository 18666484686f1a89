//! 📜 Static report templates (`.jrxml`).
//!
//! 🎬 *[somebody designed this layout in a GUI in 2014. it has outlived the GUI.]*
//!
//! Loading reads the file. Compiling pulls out what a renderer needs: the report name, the
//! declared parameters, and the text elements in document order. We do not lay anything out
//! here. We just make sure the thing is a template and learn its holes.
//!
//! A **dataset slot** is a parameter whose class is the generic data-source type. The reserved
//! `REPORT_DATA_SOURCE` parameter is never a slot.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

pub const TEMPLATE_EXTENSION: &str = "jrxml";
pub const DATA_SOURCE_CLASS: &str = "net.sf.jasperreports.engine.JRDataSource";
pub const RESERVED_DATA_SOURCE: &str = "REPORT_DATA_SOURCE";
const DEFAULT_PARAMETER_CLASS: &str = "java.lang.String";

// -- one match per markup token. comments and CDATA are eaten whole, so nothing inside them
// -- is ever mistaken for a tag. quoted attribute values may hold '>' and '/'
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<!\[CDATA\[(?P<cdata>.*?)\]\]>|<[?!][^>]*>|<(?P<close>/)?(?P<tag>[\w.:-]+)(?P<attributes>(?:[^>"']|"[^"]*"|'[^']*')*?)(?P<empty>/)?>"#,
    )
    .expect("valid xml token regex")
});
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w.:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid xml attribute regex")
});
static PARAMETER_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$P\{(\w+)\}").expect("valid parameter reference regex"));

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to load the report template {path}.")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to compile the template {path}: {reason}")]
    Compile { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParameter {
    pub name: String,
    pub class: String,
}

impl TemplateParameter {
    pub fn is_dataset_slot(&self) -> bool {
        self.class == DATA_SOURCE_CLASS && self.name != RESERVED_DATA_SOURCE
    }
}

/// 🏗️ A template that has been read and picked apart. Immutable after compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    path: PathBuf,
    name: String,
    parameters: Vec<TemplateParameter>,
    text_elements: Vec<String>,
}

impl CompiledTemplate {
    /// 📂 Read and compile in one go.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Self::compile(path, &source)
    }

    pub fn compile(path: &Path, source: &str) -> Result<Self, TemplateError> {
        let compile_error = |reason: String| TemplateError::Compile {
            path: path.to_path_buf(),
            reason,
        };

        // 🌳 walk the element tree. only the root's own <parameter> children are report
        // parameters, the ones under <subDataset> belong to that dataset
        let mut open: Vec<String> = Vec::new();
        let mut name: Option<String> = None;
        let mut parameters: Vec<TemplateParameter> = Vec::new();
        let mut text_elements: Vec<String> = Vec::new();

        for token in TOKEN.captures_iter(source) {
            if let Some(cdata) = token.name("cdata") {
                if open
                    .last()
                    .is_some_and(|element| element == "text" || element == "textFieldExpression")
                {
                    text_elements.push(cdata.as_str().trim().to_string());
                }
                continue;
            }
            // -- comments, prologs and doctypes
            let Some(tag) = token.name("tag") else {
                continue;
            };
            let tag = local_name(tag.as_str());

            if token.name("close").is_some() {
                match open.pop() {
                    Some(element) if element == tag => continue,
                    Some(element) => {
                        return Err(compile_error(format!("</{tag}> closes <{element}>")));
                    }
                    None => return Err(compile_error(format!("</{tag}> closes nothing"))),
                }
            }

            let attributes = token.name("attributes").map_or("", |m| m.as_str());
            match open.len() {
                0 if name.is_some() => {
                    return Err(compile_error(format!(
                        "<{tag}> follows the <jasperReport> root element"
                    )));
                }
                0 if tag != "jasperReport" => {
                    return Err(compile_error(format!(
                        "the root element is <{tag}>, not <jasperReport>"
                    )));
                }
                0 => {
                    name = Some(attribute(attributes, "name").ok_or_else(|| {
                        compile_error("the <jasperReport> element has no name".into())
                    })?);
                }
                1 if tag == "parameter" => {
                    let parameter_name = attribute(attributes, "name")
                        .ok_or_else(|| compile_error("a <parameter> has no name".into()))?;
                    if parameters.iter().any(|p| p.name == parameter_name) {
                        return Err(compile_error(format!(
                            "parameter '{parameter_name}' is declared twice"
                        )));
                    }
                    let class = attribute(attributes, "class")
                        .unwrap_or_else(|| DEFAULT_PARAMETER_CLASS.to_string());
                    trace!("📜 template parameter '{}' of class {}", parameter_name, class);
                    parameters.push(TemplateParameter {
                        name: parameter_name,
                        class,
                    });
                }
                _ => {}
            }
            if token.name("empty").is_none() {
                open.push(tag.to_string());
            }
        }

        let name = name.ok_or_else(|| compile_error("no <jasperReport> root element".into()))?;
        if let Some(element) = open.last() {
            return Err(compile_error(format!("<{element}> is never closed")));
        }

        debug!(
            "📜 compiled template '{}' from {} with {} parameter(s)",
            name,
            path.display(),
            parameters.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            name,
            parameters,
            text_elements,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[TemplateParameter] {
        &self.parameters
    }

    /// 🕳️ Parameters the renderer must fill with rows.
    pub fn dataset_slots(&self) -> Vec<&TemplateParameter> {
        self.parameters
            .iter()
            .filter(|parameter| parameter.is_dataset_slot())
            .collect()
    }

    pub fn text_elements(&self) -> &[String] {
        &self.text_elements
    }
}

/// 🔄 Replace `$P{name}` references with whatever `lookup` has for them. Unknown names render empty.
pub fn substitute_parameters(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    PARAMETER_REFERENCE
        .replace_all(text, |reference: &regex::Captures<'_>| {
            lookup(&reference[1]).unwrap_or_default()
        })
        .into_owned()
}

fn attribute(attributes: &str, wanted: &str) -> Option<String> {
    ATTRIBUTE
        .captures_iter(attributes)
        .find(|pair| &pair[1] == wanted)
        .and_then(|pair| pair.get(2).or_else(|| pair.get(3)))
        .map(|value| value.as_str().to_string())
}

// -- `jr:parameter` and `parameter` are the same element to us
fn local_name(tag: &str) -> &str {
    tag.rsplit_once(':').map_or(tag, |(_, local)| local)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SLOTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<jasperReport xmlns="http://jasperreports.sourceforge.net/jasperreports" name="StockReport" pageWidth="595">
    <parameter name="WSO2" class="net.sf.jasperreports.engine.JRDataSource"/>
    <parameter name="IBM" class="net.sf.jasperreports.engine.JRDataSource"/>
    <parameter name="REPORT_DATA_SOURCE" class="net.sf.jasperreports.engine.JRDataSource"/>
    <parameter name="title"/>
    <title><band height="40">
        <staticText><reportElement x="0" y="0" width="200" height="20"/><text><![CDATA[Stock summary]]></text></staticText>
        <textField><reportElement x="0" y="20" width="200" height="20"/><textFieldExpression><![CDATA[$P{title}]]></textFieldExpression></textField>
    </band></title>
</jasperReport>"#;

    #[test]
    fn the_one_where_slots_are_found_and_the_reserved_one_is_not() -> anyhow::Result<()> {
        let template = CompiledTemplate::compile(Path::new("stocks.jrxml"), TWO_SLOTS)?;
        assert_eq!(template.name(), "StockReport");
        let slots: Vec<&str> = template.dataset_slots().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(slots, vec!["WSO2", "IBM"]);
        assert_eq!(template.parameters()[3].class, "java.lang.String");
        assert_eq!(template.text_elements(), &["Stock summary".to_string(), "$P{title}".to_string()]);
        Ok(())
    }

    const ONE_SLOT_AND_A_SUBDATASET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- <parameter name="Header" class="net.sf.jasperreports.engine.JRDataSource"/> -->
<jasperReport name="Stocks">
    <subDataset name="ChartRows">
        <parameter name="ROWS" class="net.sf.jasperreports.engine.JRDataSource"/>
        <parameter name="StockData" class="java.lang.String"/>
    </subDataset>
    <!-- <parameter name="Old" class="net.sf.jasperreports.engine.JRDataSource"/> -->
    <parameter name="StockData" class="net.sf.jasperreports.engine.JRDataSource"/>
    <title><band height="20">
        <staticText><text><![CDATA[<parameter name="Fake"/> is just words]]></text></staticText>
    </band></title>
</jasperReport>"#;

    #[test]
    fn the_one_where_only_the_roots_own_parameters_are_slots() -> anyhow::Result<()> {
        let template =
            CompiledTemplate::compile(Path::new("stocks.jrxml"), ONE_SLOT_AND_A_SUBDATASET)?;
        let slots: Vec<&str> = template.dataset_slots().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(slots, vec!["StockData"]);
        // -- the subDataset's StockData shares a name and is not a second declaration
        assert_eq!(template.parameters().len(), 1);
        assert_eq!(template.text_elements(), &["<parameter name=\"Fake\"/> is just words".to_string()]);
        Ok(())
    }

    #[test]
    fn the_one_where_single_quotes_are_still_xml() -> anyhow::Result<()> {
        let template = CompiledTemplate::compile(
            Path::new("r.jrxml"),
            "<jasperReport name='R'><parameter name='rows' class='net.sf.jasperreports.engine.JRDataSource'/></jasperReport>",
        )?;
        assert_eq!(template.name(), "R");
        assert!(template.parameters()[0].is_dataset_slot());
        Ok(())
    }

    #[test]
    fn the_one_where_a_real_duplicate_is_still_caught() {
        let err = CompiledTemplate::compile(
            Path::new("dup.jrxml"),
            r#"<jasperReport name="D"><parameter name="a"/><parameter name="a"/></jasperReport>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn the_one_where_the_tags_do_not_line_up() {
        let err = CompiledTemplate::compile(
            Path::new("broken.jrxml"),
            r#"<jasperReport name="B"><title></band></jasperReport>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("</band> closes <title>"));
        let err = CompiledTemplate::compile(Path::new("open.jrxml"), r#"<jasperReport name="B">"#)
            .unwrap_err();
        assert!(err.to_string().contains("never closed"));
    }

    #[test]
    fn the_one_where_not_a_template_does_not_compile() {
        let err = CompiledTemplate::compile(Path::new("nope.jrxml"), "<html></html>").unwrap_err();
        assert!(matches!(err, TemplateError::Compile { .. }));
        assert!(err.to_string().contains("nope.jrxml"));
    }

    #[test]
    fn the_one_where_a_missing_file_fails_to_load() {
        let err = CompiledTemplate::load(Path::new("/no/such/template.jrxml")).unwrap_err();
        assert!(matches!(err, TemplateError::Load { .. }));
    }

    #[test]
    fn the_one_where_parameters_fill_their_holes() {
        let filled = substitute_parameters("Report: $P{title} ($P{missing})", |name| {
            (name == "title").then(|| "Stocks".to_string())
        });
        assert_eq!(filled, "Report: Stocks ()");
    }
}
