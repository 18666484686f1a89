//! 🔧 Report sink configuration: raw option table in, immutable [`ReportConfig`] out.
//!
//! 🎬 *[a wall of strings arrives. `chart = "BAR"`, `series = "volume"`, `outputpath = "/tmp/{x}"`.
//! one of them is lying. we find out which before a single event shows up.]*
//!
//! Everything here runs once, at sink construction. Anything wrong is a [`SinkCreationError`]
//! naming the app, and the sink never starts. After that the config is read-only; per-batch
//! values (resolved placeholders) live in [`crate::router::ResolvedConfiguration`].
//!
//! Checks run in a fixed order: template, images, chart, chart attributes, output path,
//! format, dataset, map type, mode, query parameters. First failure wins.

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::chart::{ChartKind, ChartRequest};
use crate::common::StreamDefinition;
use crate::datasource::{DataSource, DataSourceRegistry};
use crate::export::OutputFormat;
use crate::report::{PageLayout, ReportMetadata};
use crate::router::DynamicString;
use crate::template::{TEMPLATE_EXTENSION, TemplateError};

pub const OUTPUT_PATH: &str = "outputpath";
pub const OUTPUT_FORMAT: &str = "output.format";
pub const TITLE: &str = "title";
pub const SUBTITLE: &str = "subtitle";
pub const DESCRIPTION: &str = "description";
pub const TEMPLATE: &str = "template";
pub const DATASET: &str = "dataset";
pub const HEADER: &str = "header";
pub const FOOTER: &str = "footer";
pub const CHART: &str = "chart";
pub const CHART_TITLE: &str = "chart.title";
pub const CATEGORY: &str = "category";
pub const SERIES: &str = "series";
pub const MODE: &str = "mode";
pub const DATASOURCE_NAME: &str = "datasource.name";
pub const QUERIES: &str = "queries";
pub const MAP_TYPE: &str = "map.type";

const KNOWN_OPTIONS: [&str; 17] = [
    OUTPUT_PATH,
    OUTPUT_FORMAT,
    TITLE,
    SUBTITLE,
    DESCRIPTION,
    TEMPLATE,
    DATASET,
    HEADER,
    FOOTER,
    CHART,
    CHART_TITLE,
    CATEGORY,
    SERIES,
    MODE,
    DATASOURCE_NAME,
    QUERIES,
    MAP_TYPE,
];

/// Options a template overrides. Accepted, logged, otherwise ignored.
pub const TEMPLATE_IGNORED_OPTIONS: [&str; 9] = [
    HEADER,
    FOOTER,
    SERIES,
    CATEGORY,
    CHART,
    DESCRIPTION,
    SUBTITLE,
    TITLE,
    CHART_TITLE,
];

pub const DEFAULT_TITLE: &str = "Report";
const JSON_MAP_TYPE: &str = "json";
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpeg", "jpg"];

/// 💀 Setup went wrong. Always names the owning app.
#[derive(Debug, Error)]
#[error("In 'report' sink of app {app}: {kind}")]
pub struct SinkCreationError {
    pub app: String,
    pub kind: CreationErrorKind,
}

impl SinkCreationError {
    pub fn new(app: impl Into<String>, kind: CreationErrorKind) -> Self {
        Self {
            app: app.into(),
            kind,
        }
    }
}

#[derive(Debug, Error)]
pub enum CreationErrorKind {
    #[error("'{0}' is a mandatory parameter.")]
    MissingParameter(&'static str),
    #[error("{0} is not a valid chart type. Only table,line,bar,pie charts are supported.")]
    InvalidChart(String),
    #[error("{0} is not a valid output format. Only PDF, XLS, XLSX, CSV are supported.")]
    InvalidOutputFormat(String),
    #[error("'{0}' is invalid. Should be either query or stream.")]
    InvalidMode(String),
    #[error("'{0}' should be defined when 'mode' is query.")]
    MissingQueryParameter(&'static str),
    #[error("{path} does not exist. {parameter} should be a valid path")]
    PathNotFound {
        path: PathBuf,
        parameter: &'static str,
    },
    #[error("{path} is invalid. template should have a JRXML template")]
    NotATemplate { path: PathBuf },
    #[error("Invalid path {path}. {parameter} should be an image")]
    NotAnImage {
        path: PathBuf,
        parameter: &'static str,
    },
    #[error("Invalid Property '{attribute}'. No such parameter in the stream definition")]
    UndeclaredPlaceholder { attribute: String },
    #[error("Invalid property {attribute} for {parameter}")]
    UndeclaredChartAttribute {
        attribute: String,
        parameter: &'static str,
    },
    #[error("{attribute} is invalid. Provide a numeric series column.")]
    NonNumericSeries { attribute: String },
    #[error(
        "{chart} chart definition is invalid. There is no numeric stream attribute for the series. \
         Provide a numeric series column."
    )]
    NoNumericAttribute { chart: ChartKind },
    #[error("Invalid map type {0}. Only JSON map type is allowed.")]
    InvalidMapType(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("Datasets are missing in the template provided {path}")]
    DatasetsMissing { path: PathBuf },
    #[error("Datasource '{0}' is not defined.")]
    UnknownDataSource(String),
    #[error("Invalid 'queries' value: {0}")]
    MalformedQueries(String),
}

/// 🔀 Which pipeline the sink runs. Fixed for the life of the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Stream,
    Query,
}

impl Mode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "stream" => Some(Mode::Stream),
            "query" => Some(Mode::Query),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawQuerySpec {
    query: String,
    chart: String,
    #[serde(rename = "chart.title", default)]
    chart_title: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    series: Option<String>,
}

/// 🗃️ One entry of the query list: one SQL statement, one sub-report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub query: String,
    pub chart: ChartKind,
    pub chart_title: String,
    pub category: Option<String>,
    pub series: Option<String>,
    /// Sub-report name: a stable hash of the entry as written, suffixed with the entry's
    /// position when an earlier entry already hashed the same.
    pub name: String,
}

impl QuerySpec {
    /// 🔍 Parse a JSON array of query entries. Every entry must name a query and a valid chart.
    pub fn parse_list(raw: &str) -> Result<Vec<QuerySpec>, CreationErrorKind> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(raw)
            .map_err(|error| CreationErrorKind::MalformedQueries(error.to_string()))?;
        let mut specs: Vec<QuerySpec> = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            // -- a repeated entry is a second sub-report, not a clash
            let mut name = entry_hash(&entry);
            if specs.iter().any(|earlier| earlier.name == name) {
                name = format!("{name}-{index}");
            }
            let spec: RawQuerySpec = serde_json::from_value(entry)
                .map_err(|error| CreationErrorKind::MalformedQueries(error.to_string()))?;
            let chart = spec
                .chart
                .parse::<ChartKind>()
                .map_err(|unknown| CreationErrorKind::InvalidChart(unknown.0))?;
            specs.push(QuerySpec {
                query: spec.query,
                chart,
                chart_title: spec.chart_title.unwrap_or_default(),
                category: spec.category,
                series: spec.series,
                name,
            });
        }
        Ok(specs)
    }
}

// -- serde_json keeps insertion order, so the same text always hashes the same
fn entry_hash(entry: &serde_json::Value) -> String {
    let mut hasher = DefaultHasher::new();
    entry.to_string().hash(&mut hasher);
    hasher.finish().to_string()
}

/// 🗄️ Where query mode gets its rows, and what it asks.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub datasource: DataSource,
    pub queries: Vec<QuerySpec>,
}

/// 📈 The chart options as configured. Names are `None` when unset or empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChartOptions {
    pub kind: ChartKind,
    pub title: String,
    pub category: Option<String>,
    pub series: Option<String>,
}

impl ChartOptions {
    pub fn request(&self) -> ChartRequest<'_> {
        ChartRequest {
            kind: self.kind,
            title: &self.title,
            category: self.category.as_deref(),
            series: self.series.as_deref(),
        }
    }
}

/// ✅ A validated, immutable report sink configuration.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub app_name: String,
    pub output_path: DynamicString,
    pub dataset: Option<DynamicString>,
    pub format: OutputFormat,
    pub metadata: ReportMetadata,
    pub layout: PageLayout,
    pub chart: ChartOptions,
    pub template: Option<PathBuf>,
    pub mode: Mode,
    pub query: Option<QueryConfig>,
    /// Template-overridden options that were set anyway, for the debug log.
    pub ignored_options: Vec<(String, String)>,
}

impl ReportConfig {
    /// 🔍 Validate the raw options against the declared stream and the known datasources.
    pub fn validate(
        app_name: &str,
        options: &BTreeMap<String, String>,
        stream: &StreamDefinition,
        datasources: &DataSourceRegistry,
    ) -> Result<ReportConfig, SinkCreationError> {
        let fail = |kind: CreationErrorKind| SinkCreationError::new(app_name, kind);
        let option = |key: &str| {
            options
                .get(key)
                .map(String::as_str)
                .filter(|value| !value.is_empty())
        };

        for key in options.keys() {
            if !KNOWN_OPTIONS.contains(&key.as_str()) {
                warn!("🤷 In 'report' sink of app {app_name}: unknown option '{key}' ignored");
            }
        }

        // -- files first: template, then the two images
        let template = option(TEMPLATE).map(PathBuf::from);
        if let Some(template) = &template {
            check_exists(template, TEMPLATE).map_err(fail)?;
            if !has_extension(template, &[TEMPLATE_EXTENSION]) {
                return Err(fail(CreationErrorKind::NotATemplate {
                    path: template.clone(),
                }));
            }
        }
        let header_image = option(HEADER).map(PathBuf::from);
        let footer_image = option(FOOTER).map(PathBuf::from);
        for (parameter, image) in [(HEADER, &header_image), (FOOTER, &footer_image)] {
            if let Some(image) = image {
                check_exists(image, parameter).map_err(fail)?;
                if !has_extension(image, &IMAGE_EXTENSIONS) {
                    return Err(fail(CreationErrorKind::NotAnImage {
                        path: image.clone(),
                        parameter,
                    }));
                }
            }
        }

        // -- chart, then its attributes
        let chart_raw = option(CHART).unwrap_or(ChartKind::Table.as_str());
        let kind = chart_raw
            .parse::<ChartKind>()
            .map_err(|unknown| fail(CreationErrorKind::InvalidChart(unknown.0)))?;
        let series = option(SERIES).map(str::to_string);
        let category = option(CATEGORY).map(str::to_string);
        if kind == ChartKind::Table {
            if series.is_some() || category.is_some() {
                warn!(
                    "⚠️ In 'report' sink of app {app_name}: series or category is ignored for a table chart"
                );
            }
        } else if series.is_none() && !stream.has_numeric_attribute() {
            return Err(fail(CreationErrorKind::NoNumericAttribute { chart: kind }));
        }
        if let Some(series) = &series {
            let attribute = stream.attribute(series).ok_or_else(|| {
                fail(CreationErrorKind::UndeclaredChartAttribute {
                    attribute: series.clone(),
                    parameter: SERIES,
                })
            })?;
            if !attribute.attribute_type.is_numeric() {
                return Err(fail(CreationErrorKind::NonNumericSeries {
                    attribute: series.clone(),
                }));
            }
        }
        if let Some(category) = &category {
            if stream.attribute(category).is_none() {
                return Err(fail(CreationErrorKind::UndeclaredChartAttribute {
                    attribute: category.clone(),
                    parameter: CATEGORY,
                }));
            }
        }

        // -- where it goes, and in what shape
        let output_path = option(OUTPUT_PATH)
            .map(DynamicString::parse)
            .ok_or_else(|| fail(CreationErrorKind::MissingParameter(OUTPUT_PATH)))?;
        check_output_directory(&output_path).map_err(fail)?;
        check_placeholder(&output_path, stream).map_err(fail)?;

        let format = match option(OUTPUT_FORMAT) {
            Some(raw) => raw
                .parse::<OutputFormat>()
                .map_err(|unknown| fail(CreationErrorKind::InvalidOutputFormat(unknown.0)))?,
            None => OutputFormat::default(),
        };

        let dataset = option(DATASET).map(DynamicString::parse);
        if let Some(dataset) = &dataset {
            check_placeholder(dataset, stream).map_err(fail)?;
        }

        let map_type = option(MAP_TYPE).unwrap_or(JSON_MAP_TYPE);
        if map_type != JSON_MAP_TYPE {
            return Err(fail(CreationErrorKind::InvalidMapType(map_type.to_string())));
        }

        let mode = match option(MODE) {
            Some(raw) => Mode::parse(raw)
                .ok_or_else(|| fail(CreationErrorKind::InvalidMode(raw.to_string())))?,
            None => Mode::Stream,
        };
        let query = match mode {
            Mode::Stream => None,
            Mode::Query => {
                let datasource_name = option(DATASOURCE_NAME)
                    .ok_or_else(|| fail(CreationErrorKind::MissingQueryParameter(DATASOURCE_NAME)))?;
                let queries_raw = option(QUERIES)
                    .ok_or_else(|| fail(CreationErrorKind::MissingQueryParameter(QUERIES)))?;
                let datasource = datasources.lookup(datasource_name).ok_or_else(|| {
                    fail(CreationErrorKind::UnknownDataSource(datasource_name.to_string()))
                })?;
                let queries = QuerySpec::parse_list(queries_raw).map_err(fail)?;
                Some(QueryConfig {
                    datasource,
                    queries,
                })
            }
        };

        let ignored_options = match (&template, mode) {
            (Some(_), Mode::Stream) => TEMPLATE_IGNORED_OPTIONS
                .iter()
                .filter_map(|key| option(*key).map(|value| (key.to_string(), value.to_string())))
                .collect(),
            _ => Vec::new(),
        };

        let config = ReportConfig {
            app_name: app_name.to_string(),
            output_path,
            dataset,
            format,
            metadata: ReportMetadata {
                title: option(TITLE).unwrap_or(DEFAULT_TITLE).to_string(),
                subtitle: option(SUBTITLE).unwrap_or_default().to_string(),
                description: option(DESCRIPTION).unwrap_or_default().to_string(),
            },
            layout: PageLayout {
                header_image,
                footer_image,
            },
            chart: ChartOptions {
                kind,
                title: option(CHART_TITLE).unwrap_or_default().to_string(),
                category,
                series,
            },
            template,
            mode,
            query,
            ignored_options,
        };
        debug!(
            "✅ report sink of app {} validated: {:?} mode, {} output",
            config.app_name, config.mode, config.format
        );
        Ok(config)
    }

    /// 🪣 The attribute a batch is partitioned by: the placeholder's attribute when the dataset
    /// is dynamic, the dataset text itself otherwise. `None` means each event's first attribute.
    pub fn partition_attribute(&self) -> Option<&str> {
        self.dataset.as_ref().map(|dataset| match dataset.placeholder() {
            Some(placeholder) => placeholder.attribute(),
            None => dataset.raw(),
        })
    }
}

fn check_exists(path: &Path, parameter: &'static str) -> Result<(), CreationErrorKind> {
    if path.exists() {
        Ok(())
    } else {
        Err(CreationErrorKind::PathNotFound {
            path: path.to_path_buf(),
            parameter,
        })
    }
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            allowed
                .iter()
                .any(|allowed| extension.eq_ignore_ascii_case(allowed))
        })
}

// -- a parent directory that itself holds the placeholder is only known per batch
fn check_output_directory(output_path: &DynamicString) -> Result<(), CreationErrorKind> {
    let raw = output_path.raw();
    let Some(split) = raw.rfind(MAIN_SEPARATOR) else {
        return Ok(());
    };
    let parent = &raw[..split];
    let dynamic_parent = output_path
        .placeholder()
        .is_some_and(|placeholder| parent.contains(placeholder.token()));
    if parent.is_empty() || dynamic_parent {
        return Ok(());
    }
    check_exists(Path::new(parent), OUTPUT_PATH)
}

fn check_placeholder(
    value: &DynamicString,
    stream: &StreamDefinition,
) -> Result<(), CreationErrorKind> {
    match value.placeholder() {
        Some(placeholder) if stream.attribute(placeholder.attribute()).is_none() => {
            Err(CreationErrorKind::UndeclaredPlaceholder {
                attribute: placeholder.attribute().to_string(),
            })
        }
        _ => Ok(()),
    }
}
