use crate::error::Result;
use crate::storage::columns::cast_lenient;
use arrow::array::{new_null_array, ArrayRef};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tracing::debug;

/// Schema that can hold both batches.
///
/// Existing columns keep their order and new columns follow. Where the
/// batches disagree on a type, the incoming batch wins.
pub fn unified_schema(existing: &Schema, incoming: &Schema) -> SchemaRef {
    let mut fields: Vec<Field> = Vec::with_capacity(existing.fields().len());

    for field in existing.fields() {
        let data_type = match incoming.field_with_name(field.name()) {
            Ok(new_field) => new_field.data_type().clone(),
            Err(_) => field.data_type().clone(),
        };
        if &data_type != field.data_type() {
            debug!(
                column = %field.name(),
                from = %field.data_type(),
                to = %data_type,
                "Coercing column type"
            );
        }
        fields.push(Field::new(field.name(), data_type, true));
    }

    for field in incoming.fields() {
        if existing.field_with_name(field.name()).is_err() {
            fields.push(Field::new(field.name(), field.data_type().clone(), true));
        }
    }

    Arc::new(Schema::new(fields))
}

/// Reshape a batch to the given schema: columns are reordered, missing
/// columns are filled with nulls and mismatched types are cast leniently.
pub fn conform(batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
    let columns = schema
        .fields()
        .iter()
        .map(|field| match batch.column_by_name(field.name()) {
            Some(array) => cast_lenient(array, field.data_type()),
            None => Ok(new_null_array(field.data_type(), batch.num_rows())),
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

/// Concatenate batches with possibly different schemas, later batches
/// winning type conflicts.
pub fn concat_unified(batches: &[RecordBatch]) -> Result<Option<RecordBatch>> {
    let Some(first) = batches.first() else {
        return Ok(None);
    };

    let mut schema = first.schema();
    for batch in &batches[1..] {
        schema = unified_schema(&schema, &batch.schema());
    }

    let conformed = batches
        .iter()
        .map(|batch| conform(batch, &schema))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(concat_batches(&schema, &conformed)?))
}

/// True when the column holds text.
pub fn is_text(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View)
}
