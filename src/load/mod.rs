// src/load/mod.rs
pub mod rows;
pub mod schema;

use crate::error::{EtlError, Result};
use crate::sink::Sink;
use arrow::record_batch::RecordBatch;
use tracing::{info, instrument};

pub use schema::{create_table_sql, expected_columns, TARGET_COLUMNS};

/// What a load did to the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Rows sent by this call.
    pub inserted: usize,
    /// `count(*)` of the whole table after the insert, including earlier runs.
    pub table_total: u64,
}

/// Append `batch` to `table`, creating the table if needed.
///
/// Empty input and missing columns are rejected before the sink is touched.
/// There is no rollback: a failure mid-insert can leave a partial table.
#[instrument(level = "info", skip(sink, batch), fields(rows = batch.num_rows()))]
pub async fn load<S: Sink>(sink: &S, batch: &RecordBatch, table: &str) -> Result<LoadSummary> {
    if batch.num_rows() == 0 {
        return Err(EtlError::EmptyInput);
    }
    schema::check_columns(batch)?;
    schema::validate_table_name(table)?;

    let batch = rows::coerce_subscription_date(batch)?;
    let values = rows::to_rows(&batch)?;
    let inserted = values.len();

    sink.execute(&schema::create_table_sql(table)).await?;
    sink.insert(table, &expected_columns(), values).await?;

    let result = sink.query(&schema::count_sql(table)).await?;
    let table_total = result
        .first()
        .and_then(|row| row.first())
        .ok_or_else(|| EtlError::Sink("count query returned no rows".into()))?
        .trim()
        .parse::<u64>()
        .map_err(|e| EtlError::Sink(format!("count query returned a non-number: {e}")))?;

    info!(table, inserted, table_total, "load complete");
    Ok(LoadSummary {
        inserted,
        table_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, Value};
    use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray, UInt32Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn canonical(n: u32) -> RecordBatch {
        let mut fields = Vec::new();
        let mut cols: Vec<ArrayRef> = Vec::new();
        for (name, ty) in TARGET_COLUMNS {
            match *ty {
                "UInt32" => {
                    fields.push(Field::new(*name, DataType::UInt32, true));
                    cols.push(Arc::new(UInt32Array::from_iter_values(0..n)));
                }
                "DateTime" => {
                    fields.push(Field::new(*name, crate::transform::timestamp_type(), true));
                    cols.push(Arc::new(TimestampMicrosecondArray::from_iter_values(
                        (0..n).map(|i| i as i64 * 86_400_000_000),
                    )));
                }
                _ => {
                    fields.push(Field::new(*name, DataType::Utf8, true));
                    cols.push(Arc::new(StringArray::from_iter_values(
                        (0..n).map(|i| format!("{name}-{i}")),
                    )));
                }
            }
        }
        RecordBatch::try_new(Arc::new(Schema::new(fields)), cols).unwrap()
    }

    #[tokio::test]
    async fn test_load_creates_inserts_counts() {
        let sink = MemorySink::new();
        let summary = load(&sink, &canonical(3), "customers").await.unwrap();
        assert_eq!(
            summary,
            LoadSummary {
                inserted: 3,
                table_total: 3
            }
        );

        let table = sink.table("customers").unwrap();
        assert_eq!(table.columns, expected_columns());
        assert_eq!(table.rows[2][0], Value::UInt32(2));
        assert_eq!(table.rows[2][1], Value::String("first_name-2".into()));
        assert_eq!(sink.insert_calls(), 1);
    }

    #[tokio::test]
    async fn test_total_is_table_total_not_rows_inserted() {
        let sink = MemorySink::new();
        let first = load(&sink, &canonical(2), "customers").await.unwrap();
        let second = load(&sink, &canonical(2), "customers").await.unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.table_total, 2);
        assert_eq!(second.inserted, 2);
        assert_eq!(second.table_total, 4);
    }

    #[tokio::test]
    async fn test_empty_input_touches_nothing() {
        let sink = MemorySink::new();
        let err = load(&sink, &canonical(0), "customers").await.unwrap_err();
        assert!(matches!(err, EtlError::EmptyInput));
        assert!(sink.statements().is_empty());
        assert_eq!(sink.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_columns_touch_nothing() {
        let full = canonical(2);
        let keep: Vec<usize> = vec![0, 1];
        let partial = full.project(&keep).unwrap();

        let sink = MemorySink::new();
        let err = load(&sink, &partial, "customers_test_missing_cols")
            .await
            .unwrap_err();
        match err {
            EtlError::SchemaMismatch { missing } => {
                assert_eq!(missing.len(), 10);
                for col in ["email", "subscription_date", "website", "full_name"] {
                    assert!(missing.iter().any(|m| m == col), "{col}");
                }
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
        assert!(sink.statements().is_empty());
        assert_eq!(sink.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_extra_columns_are_not_loaded() {
        let full = canonical(1);
        let mut fields: Vec<Field> = full
            .schema()
            .fields()
            .iter()
            .map(|f| f.as_ref().clone())
            .collect();
        fields.insert(1, Field::new("customer_id_original", DataType::Utf8, true));
        let mut cols = full.columns().to_vec();
        cols.insert(1, Arc::new(StringArray::from(vec!["abc"])));
        let with_original = RecordBatch::try_new(Arc::new(Schema::new(fields)), cols).unwrap();

        let sink = MemorySink::new();
        load(&sink, &with_original, "customers").await.unwrap();
        let table = sink.table("customers").unwrap();
        assert_eq!(table.rows[0].len(), 12);
        assert!(!table.columns.iter().any(|c| c == "customer_id_original"));
    }

    #[tokio::test]
    async fn test_bad_table_name_touches_nothing() {
        let sink = MemorySink::new();
        let err = load(&sink, &canonical(1), "x; DROP TABLE y").await.unwrap_err();
        assert!(matches!(err, EtlError::InvalidTableName(_)));
        assert!(sink.statements().is_empty());
    }
}
