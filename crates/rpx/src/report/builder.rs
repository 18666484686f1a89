use tracing::trace;

use crate::report::{ColumnRef, ModelError, ReportColumn, ReportModel};
use crate::schema::InferredColumn;
use crate::style;

/// 🔨 Translates inferred columns into report-model fields and column definitions.
///
/// Each column gets its capitalized title, its share of the table width, a header style
/// from the style provider, and a highlight rule where its type has one. The model is
/// mutated in place; call this once per model. Twice is a `DuplicateField` waiting to happen.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportSchemaBuilder;

impl ReportSchemaBuilder {
    pub fn build(
        columns: &[InferredColumn],
        model: &mut ReportModel,
    ) -> Result<Vec<ColumnRef>, ModelError> {
        let mut refs = Vec::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            model.register_field(column.name.clone(), column.inferred_type)?;
            model.define_column(ReportColumn {
                property: column.name.clone(),
                column_type: column.inferred_type,
                title: column.display_title.clone(),
                width: column.width_share as u32,
                header_style: style::header_style(column.inferred_type),
                conditional_style: style::conditional_style(column.inferred_type),
            });
            trace!(
                "📐 column '{}' ({}) registered on '{}'",
                column.name,
                column.inferred_type.name(),
                model.name
            );
            refs.push(ColumnRef {
                index,
                name: column.name.clone(),
                title: column.display_title.clone(),
                column_type: column.inferred_type,
            });
        }
        Ok(refs)
    }
}
