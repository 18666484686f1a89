//! 📄 Rows straight from a published batch. The schema is guessed from the first event.

use tracing::{debug, trace};

use crate::common::{EventBatch, Record};
use crate::providers::DataProvider;
use crate::report::{ColumnRef, ModelError, ReportModel, ReportSchemaBuilder};
use crate::router::{DynamicString, ResolvedConfiguration};
use crate::schema::{self, InferredColumn, SchemaError};

/// 🪣 One bucket of rows, keyed by the value of the partition attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetPartition {
    pub name: String,
    pub rows: Vec<Record>,
}

/// 📨 Rows from a parsed event batch, with the schema inferred from its first record.
///
/// Inference happens once, at construction. A provider is built per publish call and dropped
/// with it, so two batches of different shapes never share a schema.
#[derive(Debug, Clone)]
pub struct EventDataProvider {
    batch: EventBatch,
    inferred: Vec<InferredColumn>,
    columns: Vec<ColumnRef>,
}

impl EventDataProvider {
    pub fn new(batch: EventBatch) -> Result<Self, SchemaError> {
        let inferred = schema::infer_batch(&batch)?;
        let columns = inferred
            .iter()
            .enumerate()
            .map(|(index, column)| ColumnRef {
                index,
                name: column.name.clone(),
                title: column.display_title.clone(),
                column_type: column.inferred_type,
            })
            .collect();
        trace!(
            "🔬 inferred {} column(s) from a batch of {} event(s)",
            inferred.len(),
            batch.len()
        );
        Ok(Self {
            batch,
            inferred,
            columns,
        })
    }

    /// 📨 Parse a publish payload and infer straight away.
    pub fn parse(payload: &str) -> Result<Self, SchemaError> {
        Self::new(EventBatch::parse(payload)?)
    }

    pub fn inferred_columns(&self) -> &[InferredColumn] {
        &self.inferred
    }

    /// 🔨 Register this batch's schema on a model. Once per model.
    pub fn bind_to(&self, model: &mut ReportModel) -> Result<Vec<ColumnRef>, ModelError> {
        ReportSchemaBuilder::build(&self.inferred, model)
    }

    pub fn rows(&self) -> &[Record] {
        self.batch.records()
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.batch.into_records()
    }

    pub fn first_record(&self) -> Result<&Record, SchemaError> {
        self.batch.first()
    }

    /// 🧭 Resolve the configured path and dataset against the first record.
    pub fn resolve(
        &self,
        output_path: &DynamicString,
        dataset: Option<&DynamicString>,
    ) -> Result<ResolvedConfiguration, SchemaError> {
        Ok(ResolvedConfiguration::resolve(
            output_path,
            dataset,
            self.first_record()?,
        ))
    }

    /// 🪣 Split the batch into named datasets by the value each event holds for `attribute`.
    ///
    /// With no attribute configured, each event is keyed by the value of its own first
    /// attribute. Buckets come back in first-appearance order; the partition attribute stays
    /// in the rows.
    pub fn partition_by(&self, attribute: Option<&str>) -> Result<Vec<DatasetPartition>, SchemaError> {
        let mut partitions: Vec<DatasetPartition> = Vec::new();
        for record in self.rows() {
            let key = match attribute {
                Some(attribute) => attribute,
                None => record.keys().next().ok_or(SchemaError::EmptyRecord)?,
            };
            let name = record
                .get(key)
                .ok_or_else(|| SchemaError::UnknownColumn {
                    name: key.to_string(),
                })?
                .to_string();

            match partitions.iter_mut().find(|partition| partition.name == name) {
                Some(partition) => partition.rows.push(record.clone()),
                None => partitions.push(DatasetPartition {
                    name,
                    rows: vec![record.clone()],
                }),
            }
        }
        debug!(
            "🪣 batch of {} event(s) split into {} dataset(s)",
            self.batch.len(),
            partitions.len()
        );
        Ok(partitions)
    }
}

impl DataProvider for EventDataProvider {
    fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }
}
