use crate::error::Result;
use crate::transform::columns::rebuild;
use arrow::{
    array::{ArrayRef, StringArray},
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Trim surrounding whitespace in every Utf8 column. Other columns pass through.
pub fn trim_text_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut cols = Vec::with_capacity(batch.num_columns());
    for arr in batch.columns() {
        if let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() {
            let trimmed: StringArray = sarr.iter().map(|opt| opt.map(str::trim)).collect();
            cols.push(Arc::new(trimmed) as ArrayRef);
            continue;
        }
        cols.push(arr.clone());
    }

    rebuild(
        schema.fields().iter().cloned().collect(),
        cols,
        batch.num_rows(),
    )
}
