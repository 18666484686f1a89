//! 🔬 Schema inference: turning "here's some JSON" into "here are your columns".
//!
//! 🎬 *[a batch arrives. nobody declared its shape. the first record is asked to speak for everyone.]*
//!
//! The first record of a batch is the schema template: every attribute becomes a column,
//! left to right in arrival order, typed by the runtime value it holds. The rest of the
//! batch is assumed to look the same. If it doesn't, that is the renderer's problem later
//! and a stern log message's problem never.
//!
//! ⚠️ No caching across batches. Two batches with different shapes get two different
//! schemas. The inferencer has no memory. It lives in the moment. Very zen. 🦆

use thiserror::Error;

use crate::common::{EventBatch, Record};

/// 📏 The fixed table width that columns share between them.
pub const COLUMN_WIDTH: u32 = 400;

/// 🏷️ What a column holds, as inferred from a runtime value or reported by a SQL driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Long,
    Float,
    Double,
    String,
    Boolean,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::Long | ColumnType::Float | ColumnType::Double
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Long => "long",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::String => "string",
            ColumnType::Boolean => "boolean",
        }
    }
}

/// 💀 Everything that can go wrong between a payload and a column list.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("the batch holds no events, so there is no first record to infer a schema from")]
    EmptyBatch,
    #[error("the first record has no attributes, so there are no columns to infer")]
    EmptyRecord,
    #[error("event #{index} is not a JSON object")]
    NotAnObject { index: usize },
    #[error("attribute '{attribute}' holds an unsupported {kind} value")]
    UnsupportedValue { attribute: String, kind: &'static str },
    #[error("column index {index} is out of range, only {len} column(s) exist")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no column named '{name}'")]
    UnknownColumn { name: String },
    #[error("the payload is not valid JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// 📐 A column derived from record contents rather than declared ahead of time.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredColumn {
    pub name: String,
    pub inferred_type: ColumnType,
    pub display_title: String,
    pub width_share: f32,
}

impl InferredColumn {
    pub fn new(name: impl Into<String>, inferred_type: ColumnType, column_count: usize) -> Self {
        let name = name.into();
        Self {
            display_title: capitalize(&name),
            width_share: COLUMN_WIDTH as f32 / column_count.max(1) as f32,
            inferred_type,
            name,
        }
    }
}

/// 🔍 Infer the ordered column list from one record.
///
/// One column per attribute, in the record's key order. The type comes from the value
/// itself: a JSON `"100"` is a string column, however numeric it looks from across the room.
pub fn infer(record: &Record) -> Result<Vec<InferredColumn>, SchemaError> {
    if record.is_empty() {
        return Err(SchemaError::EmptyRecord);
    }
    let column_count = record.len();
    record
        .iter()
        .map(|(name, value)| {
            let inferred_type = value.column_type().ok_or_else(|| SchemaError::UnsupportedValue {
                attribute: name.to_string(),
                kind: "null",
            })?;
            Ok(InferredColumn::new(name, inferred_type, column_count))
        })
        .collect()
}

/// 🥇 Infer from the first record of a batch. Empty batches are an error, not a default.
pub fn infer_batch(batch: &EventBatch) -> Result<Vec<InferredColumn>, SchemaError> {
    infer(batch.first()?)
}

/// 🔠 First letter up, the rest untouched. `volume` → `Volume`, `iPhone` → `IPhone`. Sorry, Apple.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
