// src/load/rows.rs

use super::schema::TARGET_COLUMNS;
use crate::error::{EtlError, Result};
use crate::sink::Value;
use crate::transform::{self, SUBSCRIPTION_DATE};
use arrow::{
    array::{Array, ArrayRef, StringArray, TimestampMicrosecondArray, UInt32Array},
    compute::{cast_with_options, CastOptions},
    datatypes::DataType,
    record_batch::RecordBatch,
};

/// Bring `subscription_date` to the canonical timestamp type if it isn't already.
/// Text is parsed leniently; unparseable values become null.
pub fn coerce_subscription_date(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    match schema.column_with_name(SUBSCRIPTION_DATE) {
        Some((_, field)) if field.data_type() == &transform::timestamp_type() => Ok(batch.clone()),
        Some(_) => transform::parse_subscription_dates(batch),
        None => Ok(batch.clone()),
    }
}

fn strict_cast(arr: &ArrayRef, to: &DataType) -> Result<ArrayRef> {
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    cast_with_options(arr, to, &options).map_err(Into::into)
}

fn column(batch: &RecordBatch, name: &str) -> Result<ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| EtlError::SchemaMismatch {
            missing: vec![name.to_string()],
        })?;
    Ok(batch.column(idx).clone())
}

/// Lay every row out in target-column order as sink values.
pub fn to_rows(batch: &RecordBatch) -> Result<Vec<Vec<Value>>> {
    let n = batch.num_rows();
    let mut rows: Vec<Vec<Value>> = (0..n)
        .map(|_| Vec::with_capacity(TARGET_COLUMNS.len()))
        .collect();

    for (name, ty) in TARGET_COLUMNS {
        let arr = column(batch, name)?;
        match *ty {
            "UInt32" => {
                let ids = strict_cast(&arr, &DataType::UInt32)?;
                let ids = ids
                    .as_any()
                    .downcast_ref::<UInt32Array>()
                    .ok_or_else(|| EtlError::Sink(format!("{name} is not UInt32")))?;
                for (row, v) in rows.iter_mut().zip(ids.iter()) {
                    row.push(v.map_or(Value::Null, Value::UInt32));
                }
            }
            "DateTime" => {
                let ts = strict_cast(&arr, &transform::timestamp_type())?;
                let ts = ts
                    .as_any()
                    .downcast_ref::<TimestampMicrosecondArray>()
                    .ok_or_else(|| EtlError::Sink(format!("{name} is not a timestamp")))?;
                for (i, row) in rows.iter_mut().enumerate() {
                    let v = if ts.is_null(i) {
                        None
                    } else {
                        ts.value_as_datetime(i)
                    };
                    row.push(v.map_or(Value::Null, Value::DateTime));
                }
            }
            _ => {
                let text = strict_cast(&arr, &DataType::Utf8)?;
                let text = text
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| EtlError::Sink(format!("{name} is not text")))?;
                for (row, v) in rows.iter_mut().zip(text.iter()) {
                    row.push(v.map_or(Value::Null, |s| Value::String(s.to_string())));
                }
            }
        }
    }
    Ok(rows)
}
