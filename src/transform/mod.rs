// src/transform/mod.rs
pub mod columns;
pub mod date_parser;
pub mod keys;
pub mod trimming;

use crate::error::Result;
use arrow::{
    array::{new_null_array, Array, ArrayRef, BooleanArray, StringArray, TimestampMicrosecondArray},
    compute::{cast, filter_record_batch},
    datatypes::{DataType, TimeUnit},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::{debug, info};

pub use columns::{normalize_column_name, CANONICAL_COLUMNS, DROPPED_COLUMNS};
pub use date_parser::parse_datetime;

pub const SUBSCRIPTION_DATE: &str = "subscription_date";
pub const CUSTOMER_ID: &str = "customer_id";
pub const CUSTOMER_ID_ORIGINAL: &str = "customer_id_original";
pub const FULL_NAME: &str = "full_name";

/// The canonical type of `subscription_date`.
pub fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, None)
}

/// Clean a raw customer table into the canonical shape.
///
/// Steps run in a fixed order and each depends on the previous ones:
/// prune → rename → parse dates → drop undated rows → trim → full_name →
/// keep original id → surrogate id → project → dedupe.
///
/// Returns a zero-row batch when every row is filtered out.
#[tracing::instrument(level = "info", skip(raw), fields(rows = raw.num_rows(), cols = raw.num_columns()))]
pub fn transform(raw: &RecordBatch) -> Result<RecordBatch> {
    let batch = columns::drop_columns(raw, DROPPED_COLUMNS)?;
    let batch = columns::normalize_columns(&batch)?;

    let batch = parse_subscription_dates(&batch)?;
    let before = batch.num_rows();
    let batch = drop_undated_rows(&batch)?;
    debug!(dropped = before - batch.num_rows(), "removed rows without a subscription date");

    let batch = trimming::trim_text_columns(&batch)?;
    let batch = add_full_name(&batch)?;
    let batch = preserve_original_id(&batch)?;
    let batch = assign_surrogate_ids(&batch)?;

    let batch = columns::project_canonical(&batch)?;
    let before = batch.num_rows();
    let out = keys::drop_duplicate_rows(&batch)?;
    debug!(dropped = before - out.num_rows(), "removed duplicate rows");

    info!(rows = out.num_rows(), cols = out.num_columns(), "transform complete");
    Ok(out)
}

fn text_column(batch: &RecordBatch, name: &str) -> Result<Option<StringArray>> {
    let Ok(idx) = batch.schema().index_of(name) else {
        return Ok(None);
    };
    let arr = cast(batch.column(idx), &DataType::Utf8)?;
    let sarr = arr
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .unwrap_or_else(|| StringArray::from(vec![None::<&str>; arr.len()]));
    Ok(Some(sarr))
}

/// Text → timestamp; anything unparseable becomes null. Already-temporal
/// columns are cast to the canonical unit.
pub fn parse_subscription_dates(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let Some((idx, field)) = schema.column_with_name(SUBSCRIPTION_DATE) else {
        return Ok(batch.clone());
    };
    let arr = batch.column(idx);

    let parsed: ArrayRef = match field.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            let sarr = cast(arr, &DataType::Utf8)?;
            let sarr = sarr
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| {
                    arrow::error::ArrowError::CastError("subscription_date is not text".into())
                })?;
            let ts: TimestampMicrosecondArray = sarr
                .iter()
                .map(|opt| opt.and_then(date_parser::parse_timestamp_micros))
                .collect();
            Arc::new(ts)
        }
        _ => cast(arr, &timestamp_type())?,
    };

    columns::with_column(batch, SUBSCRIPTION_DATE, parsed)
}

fn drop_undated_rows(batch: &RecordBatch) -> Result<RecordBatch> {
    let Ok(idx) = batch.schema().index_of(SUBSCRIPTION_DATE) else {
        return Ok(batch.clone());
    };
    let dates = batch.column(idx);
    if dates.null_count() == 0 {
        return Ok(batch.clone());
    }
    let mask: BooleanArray = (0..dates.len()).map(|i| Some(dates.is_valid(i))).collect();
    filter_record_batch(batch, &mask).map_err(Into::into)
}

/// `first_name + " " + last_name`, null when either part is missing.
fn add_full_name(batch: &RecordBatch) -> Result<RecordBatch> {
    let first = text_column(batch, "first_name")?;
    let last = text_column(batch, "last_name")?;

    let full: ArrayRef = match (first, last) {
        (Some(first), Some(last)) => {
            let joined: StringArray = first
                .iter()
                .zip(last.iter())
                .map(|(f, l)| match (f, l) {
                    (Some(f), Some(l)) => Some(format!("{f} {l}")),
                    _ => None,
                })
                .collect();
            Arc::new(joined)
        }
        _ => new_null_array(&DataType::Utf8, batch.num_rows()),
    };
    columns::with_column(batch, FULL_NAME, full)
}

fn preserve_original_id(batch: &RecordBatch) -> Result<RecordBatch> {
    let original: ArrayRef = match text_column(batch, CUSTOMER_ID)? {
        Some(ids) => Arc::new(ids),
        None => new_null_array(&DataType::Utf8, batch.num_rows()),
    };
    columns::with_column(batch, CUSTOMER_ID_ORIGINAL, original)
}

fn assign_surrogate_ids(batch: &RecordBatch) -> Result<RecordBatch> {
    let original = text_column(batch, CUSTOMER_ID_ORIGINAL)?
        .unwrap_or_else(|| StringArray::from(vec![None::<&str>; batch.num_rows()]));
    let codes = keys::factorize(&original)?;
    columns::with_column(batch, CUSTOMER_ID, Arc::new(codes))
}
