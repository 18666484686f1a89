//! 📦 Common data structures: the building blocks of rpx
//!
//! ---
//!
//! 🎬 COLD OPEN. INT. STREAM PROCESSOR, 3:47 AM
//!
//! The events arrive as JSON. They always arrive as JSON. Sometimes one at a time,
//! sometimes as an array, sometimes wrapped in an `{"event": ...}` envelope like a
//! gift nobody asked for. This module unwraps the gift, checks the receipt, and hands
//! back something with actual types on it.
//!
//! 🦆
//!
//! Three things live here:
//! - [`Value`]: a tagged union over the scalars an event attribute can hold. Inferred
//!   once from the JSON token, never re-interpreted afterwards.
//! - [`Record`] / [`EventBatch`]: one event, and one delivery of events. Attribute
//!   order is preserved because it decides column order later. Do not sort it.
//! - [`StreamDefinition`]: the declared schema of the stream the sink is attached to.
//!   Validation runs against this, never against live records.

use std::fmt;

use serde::Deserialize;

use crate::schema::{ColumnType, SchemaError};

/// 🎯 One attribute value. Six scalar flavours plus `Null`.
///
/// `Null` is only ever produced by relational rows (a SQL NULL is a real thing that
/// happens to real people). JSON `null` is rejected during event parsing, because an
/// event attribute with no value has no type, and a column with no type has no business
/// being in a report.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bool(bool),
    Null,
}

impl Value {
    /// 🔍 The column type this value would infer as. `Null` infers nothing.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Int(_) => Some(ColumnType::Integer),
            Value::Long(_) => Some(ColumnType::Long),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Double(_) => Some(ColumnType::Double),
            Value::String(_) => Some(ColumnType::String),
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Null => None,
        }
    }

    /// 🔢 Numeric view for chart series. Strings that *look* numeric stay strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 🔄 Convert one JSON token into a typed value.
    ///
    /// Integers that fit 32 bits are `Int`, bigger ones `Long`, anything with a fraction
    /// is `Double`. Objects, arrays and null are refused: a report cell holds a scalar.
    pub fn from_json(attribute: &str, token: &serde_json::Value) -> Result<Self, SchemaError> {
        match token {
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(i32::try_from(i).map_or(Value::Long(i), Value::Int))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Double(f))
                } else {
                    // -- 💀 u64 beyond i64::MAX. technically a number. emotionally a threat.
                    Err(SchemaError::UnsupportedValue {
                        attribute: attribute.to_string(),
                        kind: "unsigned integer beyond 64-bit signed range",
                    })
                }
            }
            serde_json::Value::Null => Err(SchemaError::UnsupportedValue {
                attribute: attribute.to_string(),
                kind: "null",
            }),
            serde_json::Value::Array(_) => Err(SchemaError::UnsupportedValue {
                attribute: attribute.to_string(),
                kind: "array",
            }),
            serde_json::Value::Object(_) => Err(SchemaError::UnsupportedValue {
                attribute: attribute.to_string(),
                kind: "object",
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Null => Ok(()),
        }
    }
}

/// 📄 One event: attribute name → value, in the order the attributes arrived.
///
/// A `Vec` of pairs rather than a map. Records are a handful of attributes wide, the
/// lookups are linear and boring, and insertion order comes for free. Boring is a feature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// ➕ Append an attribute. A repeated name overwrites in place and keeps its slot.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 🔄 Build a record from a JSON object, keeping key order (serde_json `preserve_order`).
    pub fn from_json_object(
        object: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, SchemaError> {
        let mut record = Record::new();
        for (name, token) in object {
            record.insert(name.clone(), Value::from_json(name, token)?);
        }
        Ok(record)
    }
}

impl<N: Into<String>> FromIterator<(N, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (N, Value)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// 📦 One delivery of events to the sink.
///
/// A payload holding a single event is normalized into a one-element batch, so nothing
/// downstream ever has to ask "was this an array?". Nobody wants to ask that twice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBatch {
    records: Vec<Record>,
}

impl EventBatch {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// 🔍 Parse a publish payload.
    ///
    /// Accepts a JSON array of events or one bare event. Each event may be wrapped in the
    /// host's `{"event": {...}}` envelope or be the attribute object itself.
    pub fn parse(payload: &str) -> Result<Self, SchemaError> {
        let parsed: serde_json::Value = serde_json::from_str(payload)?;
        let events = match parsed {
            serde_json::Value::Array(events) => events,
            single => vec![single],
        };

        let mut records = Vec::with_capacity(events.len());
        for (index, event) in events.iter().enumerate() {
            let object = unwrap_envelope(event).ok_or(SchemaError::NotAnObject { index })?;
            records.push(Record::from_json_object(object)?);
        }
        Ok(Self { records })
    }

    /// 🥇 The schema template for the whole batch. An empty batch has no template.
    pub fn first(&self) -> Result<&Record, SchemaError> {
        self.records.first().ok_or(SchemaError::EmptyBatch)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// -- 🎁 `{"event": {...}}` → `{...}`. anything else that is an object passes through as-is.
fn unwrap_envelope(event: &serde_json::Value) -> Option<&serde_json::Map<String, serde_json::Value>> {
    let object = event.as_object()?;
    if object.len() == 1 {
        if let Some(serde_json::Value::Object(inner)) = object.get("event") {
            return Some(inner);
        }
    }
    Some(object)
}

/// 🏷️ Declared attribute types of the host stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Object,
}

impl AttributeType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            AttributeType::Int | AttributeType::Long | AttributeType::Float | AttributeType::Double
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
}

/// 📜 The declared stream the sink hangs off. Ordered, because order is meaning here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamDefinition {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl StreamDefinition {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    pub fn has_numeric_attribute(&self) -> bool {
        self.attributes
            .iter()
            .any(|attribute| attribute.attribute_type.is_numeric())
    }
}
