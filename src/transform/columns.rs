// src/transform/columns.rs

use crate::error::Result;
use arrow::{
    array::ArrayRef,
    datatypes::{Field, FieldRef, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use std::sync::Arc;

/// Source columns that never make it into the canonical shape.
/// Matched against the raw header, before normalization.
pub const DROPPED_COLUMNS: &[&str] = &["Index", "Unnamed: 0", "id", "uuid", "zip", "address"];

/// Output layout of the transform, in order.
pub const CANONICAL_COLUMNS: &[&str] = &[
    "customer_id",
    "customer_id_original",
    "first_name",
    "last_name",
    "full_name",
    "company",
    "city",
    "country",
    "phone_1",
    "phone_2",
    "email",
    "subscription_date",
    "website",
];

/// Lowercase, trim, then map spaces and hyphens to underscores.
///
/// `"  Phone-1 "` → `"phone_1"`. Running it on its own output is a no-op.
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().trim().replace([' ', '-'], "_")
}

/// Rebuild a batch from parts, keeping the row count even with zero columns.
pub(crate) fn rebuild(
    fields: Vec<FieldRef>,
    columns: Vec<ArrayRef>,
    num_rows: usize,
) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
    RecordBatch::try_new_with_options(schema, columns, &options).map_err(Into::into)
}

/// Remove every column whose name is in `names`. Absent names are ignored.
pub fn drop_columns(batch: &RecordBatch, names: &[&str]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let (fields, columns): (Vec<FieldRef>, Vec<ArrayRef>) = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .filter(|(f, _)| !names.contains(&f.name().as_str()))
        .map(|(f, c)| (f.clone(), c.clone()))
        .unzip();
    rebuild(fields, columns, batch.num_rows())
}

/// Rename every column through [`normalize_column_name`].
pub fn normalize_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let fields: Vec<FieldRef> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| {
            let renamed = f.as_ref().clone().with_name(normalize_column_name(f.name()));
            Arc::new(renamed)
        })
        .collect();
    rebuild(fields, batch.columns().to_vec(), batch.num_rows())
}

/// Replace the column called `name` in place, or append it when absent.
pub fn with_column(batch: &RecordBatch, name: &str, array: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut columns = batch.columns().to_vec();
    let field = Arc::new(Field::new(name, array.data_type().clone(), true));

    match schema.column_with_name(name) {
        Some((idx, _)) => {
            fields[idx] = field;
            columns[idx] = array;
        }
        None => {
            fields.push(field);
            columns.push(array);
        }
    }
    rebuild(fields, columns, batch.num_rows())
}

/// Keep the canonical columns that exist, in canonical order.
pub fn project_canonical(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let indices: Vec<usize> = CANONICAL_COLUMNS
        .iter()
        .filter_map(|name| schema.column_with_name(name).map(|(idx, _)| idx))
        .collect();
    batch.project(&indices).map_err(Into::into)
}
