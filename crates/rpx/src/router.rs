//! 🧭 Output routing: figuring out where a report goes, then sending it there.
//!
//! 🎬 *[a report is done. it stands at the crossroads. one sign says `Report{symbol}`.
//! the report does not know what a symbol is. the first event does.]*
//!
//! Two jobs:
//! 1. **Dynamic values.** A configured `outputpath` or `dataset` may carry one `{attr}`
//!    placeholder. The attribute is identified once at setup (and checked against the declared
//!    stream), then re-resolved against the first record of every batch. The result is a
//!    [`ResolvedConfiguration`], a fresh value per batch. The configuration itself never changes.
//! 2. **Export.** The rendered document goes through the format's exporter and lands at
//!    `<resolved path>.<extension>`.
//!
//! ⚠️ If the referenced attribute is missing from the live record, the placeholder text is
//! left in place. No error, no warning above debug level. It is weird. It is also how this
//! has always behaved, so the tests pin it down rather than "fix" it. 🦆

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::common::Record;
use crate::export::{Exporter, ExporterBackend, OutputFormat};
use crate::render::RenderedDocument;

// -- 🔍 one `{word}` token. `{}` matches too, and then fails validation like it deserves.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\w*\}").expect("valid placeholder regex"));

/// 🎯 A `{attr}` token found in a configured string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicPlaceholder {
    token: String,
    attribute: String,
}

impl DynamicPlaceholder {
    /// 🔍 The first placeholder in `text`, if any. Later ones are not consulted.
    pub fn find(text: &str) -> Option<Self> {
        let found = PLACEHOLDER.find(text)?;
        let token = found.as_str().to_string();
        let attribute = token[1..token.len() - 1].to_string();
        Some(Self { token, attribute })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

/// 📝 A configured string that may hold one dynamic placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicString {
    raw: String,
    placeholder: Option<DynamicPlaceholder>,
}

impl DynamicString {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let placeholder = DynamicPlaceholder::find(&raw);
        Self { raw, placeholder }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn placeholder(&self) -> Option<&DynamicPlaceholder> {
        self.placeholder.as_ref()
    }

    /// 🔄 Substitute every occurrence of the placeholder token with the record's value.
    ///
    /// No placeholder: the raw string. Attribute absent from the record: also the raw
    /// string, token and all.
    pub fn resolve(&self, record: &Record) -> String {
        let Some(placeholder) = &self.placeholder else {
            return self.raw.clone();
        };
        match record.get(placeholder.attribute()) {
            Some(value) => self.raw.replace(placeholder.token(), &value.to_string()),
            None => {
                debug!(
                    "🕳️ attribute '{}' is not in the first record, '{}' stays unresolved",
                    placeholder.attribute(),
                    self.raw
                );
                self.raw.clone()
            }
        }
    }
}

/// 📬 Output path and dataset selector for one batch, after placeholder resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfiguration {
    pub output_path: String,
    pub dataset: Option<String>,
}

impl ResolvedConfiguration {
    /// Resolve both configured strings against one record.
    pub fn resolve(
        output_path: &DynamicString,
        dataset: Option<&DynamicString>,
        record: &Record,
    ) -> Self {
        Self {
            output_path: output_path.resolve(record),
            dataset: dataset.map(|dataset| dataset.resolve(record)),
        }
    }

    /// For query mode, where there is no record to resolve against.
    pub fn unresolved(output_path: &DynamicString, dataset: Option<&DynamicString>) -> Self {
        Self {
            output_path: output_path.raw().to_string(),
            dataset: dataset.map(|dataset| dataset.raw().to_string()),
        }
    }
}

/// 🚚 Picks the exporter for the configured format and writes the bytes to disk.
#[derive(Debug)]
pub struct OutputRouter {
    format: OutputFormat,
    exporter: ExporterBackend,
}

impl OutputRouter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            exporter: ExporterBackend::from_format(format),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// 📍 `<output path>.<extension>`. Always appended, even if the path already ends in one.
    pub fn destination(&self, resolved: &ResolvedConfiguration) -> PathBuf {
        PathBuf::from(format!(
            "{}.{}",
            resolved.output_path,
            self.format.extension()
        ))
    }

    /// 💾 Export and write. Returns where the file landed.
    pub async fn publish(
        &self,
        document: &RenderedDocument,
        resolved: &ResolvedConfiguration,
    ) -> Result<PathBuf> {
        let destination = self.destination(resolved);
        let bytes = self.exporter.export(document).with_context(|| {
            format!(
                "Cannot export report '{}' as {}",
                document.name,
                self.format.extension()
            )
        })?;
        tokio::fs::write(&destination, &bytes)
            .await
            .with_context(|| {
                format!(
                    "Cannot save report {} to {}.",
                    document.name,
                    destination.display()
                )
            })?;
        info!(
            "📄 report '{}' written to {} ({} bytes)",
            document.name,
            destination.display(),
            bytes.len()
        );
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Value;

    fn record() -> Record {
        [
            ("symbol", Value::String("WSO2".into())),
            ("volume", Value::Int(100)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn the_one_where_volume_becomes_a_hundred() {
        let path = DynamicString::parse("/tmp/Report{volume}");
        assert_eq!(path.placeholder().map(|p| p.attribute()), Some("volume"));
        assert_eq!(path.resolve(&record()), "/tmp/Report100");
    }

    #[test]
    fn the_one_where_every_copy_of_the_token_gets_replaced() {
        let path = DynamicString::parse("{symbol}/{symbol}-daily");
        assert_eq!(path.resolve(&record()), "WSO2/WSO2-daily");
    }

    #[test]
    fn the_one_where_only_the_first_placeholder_counts() {
        let path = DynamicString::parse("{symbol}-{volume}");
        assert_eq!(path.placeholder().map(|p| p.attribute()), Some("symbol"));
        assert_eq!(path.resolve(&record()), "WSO2-{volume}");
    }

    #[test]
    fn the_one_where_a_missing_attribute_slips_through_silently() {
        // -- 🕳️ pass-through on an absent attribute is the observed behavior. pinned here on purpose.
        let path = DynamicString::parse("Report{price}");
        assert_eq!(path.resolve(&record()), "Report{price}");
    }

    #[test]
    fn the_one_where_plain_paths_stay_plain() {
        let path = DynamicString::parse("/tmp/plain");
        assert!(path.placeholder().is_none());
        assert_eq!(path.resolve(&record()), "/tmp/plain");
    }

    #[test]
    fn the_one_where_the_extension_is_always_appended() {
        let router = OutputRouter::new(OutputFormat::Xlsx);
        let resolved = ResolvedConfiguration {
            output_path: "/tmp/out.pdf".into(),
            dataset: None,
        };
        assert_eq!(router.destination(&resolved), PathBuf::from("/tmp/out.pdf.xlsx"));
    }

    #[test]
    fn the_one_where_dataset_and_path_resolve_together() {
        let path = DynamicString::parse("Report{symbol}");
        let dataset = DynamicString::parse("{symbol}");
        let resolved = ResolvedConfiguration::resolve(&path, Some(&dataset), &record());
        assert_eq!(resolved.output_path, "ReportWSO2");
        assert_eq!(resolved.dataset.as_deref(), Some("WSO2"));
        let untouched = ResolvedConfiguration::unresolved(&path, None);
        assert_eq!(untouched.output_path, "Report{symbol}");
    }
}
